use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::models::interview::InterviewQuestion;

/// Per-client interview context carried across requests via the session
/// cookie. Lives only in process memory; a restart loses all of it.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub state: SessionState,
}

impl Session {
    pub fn new(id: String, user_id: String) -> Self {
        let now = Instant::now();
        Self {
            id,
            user_id,
            created_at: now,
            last_accessed: now,
            state: SessionState::default(),
        }
    }

    /// Idle expiry: measured from the last access, not from creation.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.last_accessed.elapsed() > ttl
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// The mutable state bag controllers persist between requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub jd_text: Option<String>,
    pub questions: Vec<InterviewQuestion>,
    pub current_question: Option<usize>,
    /// question id -> submitted answer
    pub answers: HashMap<usize, String>,
    pub guidance: Option<String>,
    pub interview_language: Option<String>,
}

/// Shallow-merge patch: every populated field replaces the stored field
/// wholesale (the answers map included).
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub jd_text: Option<String>,
    pub questions: Option<Vec<InterviewQuestion>>,
    pub current_question: Option<usize>,
    pub answers: Option<HashMap<usize, String>>,
    pub guidance: Option<String>,
    pub interview_language: Option<String>,
}

impl SessionPatch {
    pub fn jd_text(mut self, jd_text: impl Into<String>) -> Self {
        self.jd_text = Some(jd_text.into());
        self
    }

    pub fn questions(mut self, questions: Vec<InterviewQuestion>) -> Self {
        self.questions = Some(questions);
        self
    }

    pub fn current_question(mut self, index: usize) -> Self {
        self.current_question = Some(index);
        self
    }

    pub fn answers(mut self, answers: HashMap<usize, String>) -> Self {
        self.answers = Some(answers);
        self
    }

    pub fn guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    pub fn interview_language(mut self, language: impl Into<String>) -> Self {
        self.interview_language = Some(language.into());
        self
    }
}

impl SessionState {
    pub fn apply(&mut self, patch: SessionPatch) {
        if let Some(jd_text) = patch.jd_text {
            self.jd_text = Some(jd_text);
        }
        if let Some(questions) = patch.questions {
            self.questions = questions;
        }
        if let Some(current_question) = patch.current_question {
            self.current_question = Some(current_question);
        }
        if let Some(answers) = patch.answers {
            self.answers = answers;
        }
        if let Some(guidance) = patch.guidance {
            self.guidance = Some(guidance);
        }
        if let Some(language) = patch.interview_language {
            self.interview_language = Some(language);
        }
    }
}
