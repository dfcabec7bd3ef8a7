use axum::{
    extract::{Extension, State},
    Json,
};
use tracing::info;

use crate::models::chat::ChatMessage;
use crate::models::tools::{WritingRequest, WritingResponse};
use crate::session::CurrentSession;
use crate::state::AppState;
use crate::utils::error::ApiError;

const MIN_TEXT_CHARS: usize = 20;
const MAX_TEXT_CHARS: usize = 30_000;

/// Evaluate a writing-practice submission and return structured feedback.
pub async fn evaluate(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<WritingRequest>,
) -> Result<Json<WritingResponse>, ApiError> {
    let text = request.text.trim().to_string();
    let char_count = text.chars().count();
    if char_count < MIN_TEXT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text must be at least {} characters",
            MIN_TEXT_CHARS
        )));
    }
    if char_count > MAX_TEXT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text exceeds {} characters",
            MAX_TEXT_CHARS
        )));
    }

    let task_type = request.task_type.unwrap_or_else(|| "essay".to_string());
    let language = request.language.unwrap_or_else(|| "English".to_string());

    info!(
        "Writing evaluation: session={}, chars={}, task={}",
        current.0.id,
        char_count,
        task_type
    );

    let messages = vec![
        ChatMessage::system(&state.settings.prompts.writing_coach),
        ChatMessage::user(format!(
            "Task type: {}\n\nSubmission:\n{}\n\nEvaluate the writing in {}: \
             structure, clarity, grammar, and concrete corrections.",
            task_type, text, language
        )),
    ];

    let feedback = state
        .ai
        .generate(&messages)
        .await
        .map_err(|e| ApiError::AiError(e.to_string()))?;

    Ok(Json(WritingResponse { feedback }))
}
