use axum::{
    extract::{Extension, State},
    Json,
};
use tracing::info;

use crate::models::application::{
    CoverLetterRequest, CoverLetterResponse, CvOptimizeRequest, CvOptimizeResponse,
};
use crate::models::chat::ChatMessage;
use crate::session::CurrentSession;
use crate::state::AppState;
use crate::utils::error::ApiError;

const MAX_INPUT_CHARS: usize = 30_000;

fn validated(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > MAX_INPUT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "{} exceeds {} characters",
            field, MAX_INPUT_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Generate a cover letter for a JD and candidate background. Output is
/// personalized, so unlike question generation it is never cached.
pub async fn cover_letter(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<CoverLetterRequest>,
) -> Result<Json<CoverLetterResponse>, ApiError> {
    let jd_text = validated("jd_text", &request.jd_text)?;
    let background = validated("background", &request.background)?;
    let language = request.language.unwrap_or_else(|| "English".to_string());

    info!(
        "Cover letter: session={}, jd_len={}, background_len={}",
        current.0.id,
        jd_text.len(),
        background.len()
    );

    let messages = vec![
        ChatMessage::system(&state.settings.prompts.cover_letter),
        ChatMessage::user(format!(
            "Job description:\n{}\n\nCandidate background:\n{}\n\n\
             Write a tailored cover letter in {}.",
            jd_text, background, language
        )),
    ];

    let letter = state
        .ai
        .generate(&messages)
        .await
        .map_err(|e| ApiError::AiError(e.to_string()))?;

    Ok(Json(CoverLetterResponse { letter }))
}

/// Suggest CV improvements against a target JD.
pub async fn optimize_cv(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<CvOptimizeRequest>,
) -> Result<Json<CvOptimizeResponse>, ApiError> {
    let cv_text = validated("cv_text", &request.cv_text)?;
    let jd_text = validated("jd_text", &request.jd_text)?;
    let language = request.language.unwrap_or_else(|| "English".to_string());

    info!(
        "CV optimization: session={}, cv_len={}, jd_len={}",
        current.0.id,
        cv_text.len(),
        jd_text.len()
    );

    let messages = vec![
        ChatMessage::system(&state.settings.prompts.cv_optimizer),
        ChatMessage::user(format!(
            "Target job description:\n{}\n\nCurrent CV:\n{}\n\n\
             List concrete optimization suggestions in {}.",
            jd_text, cv_text, language
        )),
    ];

    let suggestions = state
        .ai
        .generate(&messages)
        .await
        .map_err(|e| ApiError::AiError(e.to_string()))?;

    Ok(Json(CvOptimizeResponse { suggestions }))
}
