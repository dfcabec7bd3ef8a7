use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::models::chat::ChatMessage;
use crate::models::interview::{
    AnswerRequest, AnswerResponse, GuidanceRequest, GuidanceResponse, InterviewQuestion,
    QuestionsRequest, QuestionsResponse,
};
use crate::session::{CurrentSession, SessionPatch};
use crate::state::AppState;
use crate::utils::cache::cache_key;
use crate::utils::error::ApiError;
use crate::utils::json::{extract_first_json, parse_numbered_list};

const MAX_JD_CHARS: usize = 20_000;
const DEFAULT_QUESTION_COUNT: usize = 8;
const MAX_QUESTION_COUNT: usize = 20;

/// Generate interview questions from a job description. The raw AI output
/// is memoized per (JD, language, count); the parsed questions land in the
/// session state bag for later answer evaluation.
pub async fn generate_questions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<QuestionsRequest>,
) -> Result<Json<QuestionsResponse>, ApiError> {
    let jd_text = request.jd_text.trim().to_string();
    if jd_text.is_empty() {
        return Err(ApiError::BadRequest("jd_text must not be empty".to_string()));
    }
    if jd_text.chars().count() > MAX_JD_CHARS {
        return Err(ApiError::BadRequest(format!(
            "jd_text exceeds {} characters",
            MAX_JD_CHARS
        )));
    }

    let language = request
        .language
        .unwrap_or_else(|| "English".to_string());
    let count = request
        .count
        .unwrap_or(DEFAULT_QUESTION_COUNT)
        .clamp(1, MAX_QUESTION_COUNT);

    info!(
        "Question generation: session={}, jd_len={}, language={}, count={}",
        current.0.id,
        jd_text.len(),
        language,
        count
    );

    let messages = vec![
        ChatMessage::system(&state.settings.prompts.interviewer),
        ChatMessage::user(format!(
            "Job description:\n{}\n\nGenerate {} interview questions in {}. \
             Respond with a JSON array of objects: \
             {{\"id\": number, \"text\": string, \"category\": string}}.",
            jd_text, count, language
        )),
    ];

    let key = cache_key(
        "questions",
        &json!({"jd": jd_text, "language": language, "count": count}),
    );

    let ai = state.ai.clone();
    let raw = state
        .cache
        .get_or_fetch(&key, || async move { ai.generate(&messages).await })
        .await
        .map_err(|e| ApiError::AiError(e.to_string()))?;

    let questions = parse_questions(&raw)?;

    let stored = state.sessions.update_state(
        &current.0.id,
        SessionPatch::default()
            .jd_text(jd_text)
            .questions(questions.clone())
            .current_question(0)
            .interview_language(language.clone()),
    );
    if !stored {
        // Session swept between middleware and here; the response is still
        // valid, the context just won't persist.
        warn!("Session {} vanished before question storage", current.0.id);
    }

    Ok(Json(QuestionsResponse {
        session_id: current.0.id.clone(),
        language,
        questions,
    }))
}

/// Evaluate an answer against a question generated earlier in this session.
pub async fn evaluate_answer(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let answer = request.answer.trim().to_string();
    if answer.is_empty() {
        return Err(ApiError::BadRequest("answer must not be empty".to_string()));
    }

    // Re-read the session: the middleware snapshot may predate the
    // question-generation call.
    let session = state
        .sessions
        .get(&current.0.id)
        .ok_or_else(|| ApiError::NotFound("Session expired, generate questions first".to_string()))?;

    let position = session
        .state
        .questions
        .iter()
        .position(|q| q.id == request.question_id)
        .ok_or_else(|| {
            ApiError::NotFound(format!("Unknown question id {}", request.question_id))
        })?;
    let question = session.state.questions[position].clone();

    let language = session
        .state
        .interview_language
        .clone()
        .unwrap_or_else(|| "English".to_string());
    let jd_context = session.state.jd_text.clone().unwrap_or_default();

    let messages = vec![
        ChatMessage::system(&state.settings.prompts.evaluator),
        ChatMessage::user(format!(
            "Job description:\n{}\n\nInterview question: {}\n\nCandidate answer:\n{}\n\n\
             Evaluate the answer in {}: strengths, weaknesses, and a concrete improvement.",
            jd_context, question.text, answer, language
        )),
    ];

    let evaluation = state
        .ai
        .generate(&messages)
        .await
        .map_err(|e| ApiError::AiError(e.to_string()))?;

    // Record the answer and advance the cursor (shallow merge replaces the
    // whole answers map, so mutate a copy of the stored one)
    let mut answers = session.state.answers.clone();
    answers.insert(request.question_id, answer);
    state.sessions.update_state(
        &current.0.id,
        SessionPatch::default()
            .answers(answers)
            .current_question(position + 1),
    );

    debug!(
        "Evaluated answer: session={}, question={}",
        current.0.id, request.question_id
    );

    Ok(Json(AnswerResponse {
        question_id: request.question_id,
        question: question.text,
        evaluation,
    }))
}

/// Preparation guidance for the JD stored in the session (or supplied
/// inline). The result is kept in the state bag for the client to re-read.
pub async fn guidance(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<GuidanceRequest>,
) -> Result<Json<GuidanceResponse>, ApiError> {
    let session = state.sessions.get(&current.0.id);

    let jd_text = request
        .jd_text
        .map(|jd| jd.trim().to_string())
        .filter(|jd| !jd.is_empty())
        .or_else(|| session.as_ref().and_then(|s| s.state.jd_text.clone()))
        .ok_or_else(|| {
            ApiError::BadRequest(
                "No job description available; provide jd_text or generate questions first"
                    .to_string(),
            )
        })?;

    let language = session
        .as_ref()
        .and_then(|s| s.state.interview_language.clone())
        .unwrap_or_else(|| "English".to_string());

    let messages = vec![
        ChatMessage::system(&state.settings.prompts.guidance),
        ChatMessage::user(format!(
            "Job description:\n{}\n\nWrite interview preparation guidance in {}.",
            jd_text, language
        )),
    ];

    let guidance_text = state
        .ai
        .generate(&messages)
        .await
        .map_err(|e| ApiError::AiError(e.to_string()))?;

    state.sessions.update_state(
        &current.0.id,
        SessionPatch::default().guidance(guidance_text.clone()),
    );

    Ok(Json(GuidanceResponse {
        guidance: guidance_text,
    }))
}

/// Parse the model output into questions, tolerating non-JSON answers.
fn parse_questions(raw: &str) -> Result<Vec<InterviewQuestion>, ApiError> {
    if let Some(json_str) = extract_first_json(raw) {
        if let Ok(mut questions) = serde_json::from_str::<Vec<InterviewQuestion>>(json_str) {
            for (i, q) in questions.iter_mut().enumerate() {
                q.id = i + 1; // Normalize: ids must be unique and ordered
            }
            if !questions.is_empty() {
                return Ok(questions);
            }
        }
        if let Ok(texts) = serde_json::from_str::<Vec<String>>(json_str) {
            if !texts.is_empty() {
                return Ok(number_questions(texts));
            }
        }
    }

    let fallback = parse_numbered_list(raw);
    if fallback.is_empty() {
        return Err(ApiError::AiError(
            "AI response contained no usable questions".to_string(),
        ));
    }
    Ok(number_questions(fallback))
}

fn number_questions(texts: Vec<String>) -> Vec<InterviewQuestion> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| InterviewQuestion {
            id: i + 1,
            text,
            category: None,
        })
        .collect()
}
