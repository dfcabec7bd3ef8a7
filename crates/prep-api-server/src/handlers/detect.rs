use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::json;
use tracing::info;

use crate::models::chat::ChatMessage;
use crate::models::tools::{DetectRequest, DetectResponse};
use crate::session::CurrentSession;
use crate::state::AppState;
use crate::utils::cache::cache_key;
use crate::utils::error::ApiError;
use crate::utils::json::extract_first_json;

const MIN_TEXT_CHARS: usize = 40;
const MAX_TEXT_CHARS: usize = 50_000;

/// Estimate how likely a text is AI-generated. The raw verdict is memoized
/// per text so re-checking the same sample is free.
pub async fn detect(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, ApiError> {
    let text = request.text.trim().to_string();
    let char_count = text.chars().count();
    if char_count < MIN_TEXT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text must be at least {} characters for a meaningful verdict",
            MIN_TEXT_CHARS
        )));
    }
    if char_count > MAX_TEXT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text exceeds {} characters",
            MAX_TEXT_CHARS
        )));
    }

    info!(
        "AI detection: session={}, chars={}",
        current.0.id,
        char_count
    );

    let messages = vec![
        ChatMessage::system(&state.settings.prompts.detector),
        ChatMessage::user(format!(
            "Analyze whether the following text was AI-generated. Respond with a JSON \
             object: {{\"ai_probability\": number between 0 and 1, \"verdict\": string, \
             \"rationale\": string}}.\n\n{}",
            text
        )),
    ];

    let key = cache_key("detect", &json!({"text": text}));

    let ai = state.ai.clone();
    let raw = state
        .cache
        .get_or_fetch(&key, || async move { ai.generate(&messages).await })
        .await
        .map_err(|e| ApiError::AiError(e.to_string()))?;

    let mut verdict = parse_verdict(&raw)?;
    verdict.ai_probability = verdict.ai_probability.clamp(0.0, 1.0);

    Ok(Json(verdict))
}

fn parse_verdict(raw: &str) -> Result<DetectResponse, ApiError> {
    let json_str = extract_first_json(raw)
        .ok_or_else(|| ApiError::AiError("Detector returned no JSON verdict".to_string()))?;
    serde_json::from_str(json_str)
        .map_err(|e| ApiError::AiError(format!("Failed to parse detector verdict: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict_from_noisy_output() {
        let raw = r#"Here's my analysis:
{"ai_probability": 0.82, "verdict": "likely AI", "rationale": "uniform sentence rhythm"}"#;
        let verdict = parse_verdict(raw).unwrap();
        assert!((verdict.ai_probability - 0.82).abs() < f32::EPSILON);
        assert_eq!(verdict.verdict, "likely AI");
    }

    #[test]
    fn test_parse_verdict_without_json_fails() {
        assert!(parse_verdict("probably human, I think").is_err());
    }
}
