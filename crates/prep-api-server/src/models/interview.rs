use serde::{Deserialize, Serialize};

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
pub struct QuestionsRequest {
    pub jd_text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_id: usize,
    pub answer: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct GuidanceRequest {
    /// Optional override; falls back to the JD stored in the session.
    #[serde(default)]
    pub jd_text: Option<String>,
}

// ===== RESPONSE MODELS =====

/// A single generated interview question. Also stored in the session state
/// bag so answer evaluation can reference it later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewQuestion {
    /// Renumbered server-side after parsing; models are unreliable about ids.
    #[serde(default)]
    pub id: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub session_id: String,
    pub language: String,
    pub questions: Vec<InterviewQuestion>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub question_id: usize,
    pub question: String,
    pub evaluation: String,
}

#[derive(Debug, Serialize)]
pub struct GuidanceResponse {
    pub guidance: String,
}
