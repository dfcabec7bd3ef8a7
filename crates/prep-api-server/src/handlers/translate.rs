use axum::{
    extract::{Extension, Multipart, State},
    Json,
};
use serde_json::json;
use tracing::{debug, info};

use crate::document::DocumentParser;
use crate::models::chat::ChatMessage;
use crate::models::tools::{DocumentTranslateResponse, TranslateResponse, TranslateTextRequest};
use crate::session::CurrentSession;
use crate::state::AppState;
use crate::utils::cache::cache_key;
use crate::utils::error::ApiError;

const MAX_TEXT_CHARS: usize = 50_000;

fn build_translation_messages(
    system_prompt: &str,
    text: &str,
    target: &str,
    source: Option<&str>,
) -> Vec<ChatMessage> {
    let direction = match source {
        Some(source) => format!("from {} to {}", source, target),
        None => format!("to {} (detect the source language)", target),
    };
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(format!(
            "Translate the following text {}. Return only the translation.\n\n{}",
            direction, text
        )),
    ]
}

/// Translate inline text. Memoized: the same text/direction pair within the
/// cache TTL costs one upstream call.
pub async fn translate_text(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<TranslateTextRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let text = request.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text exceeds {} characters",
            MAX_TEXT_CHARS
        )));
    }
    let target = request.target_language.trim().to_string();
    if target.is_empty() {
        return Err(ApiError::BadRequest(
            "target_language must not be empty".to_string(),
        ));
    }

    info!(
        "Text translation: session={}, chars={}, target={}",
        current.0.id,
        text.len(),
        target
    );

    let key = cache_key(
        "translate",
        &json!({
            "text": text,
            "target": target,
            "source": request.source_language,
        }),
    );

    let messages = build_translation_messages(
        &state.settings.prompts.translator,
        &text,
        &target,
        request.source_language.as_deref(),
    );

    let ai = state.ai.clone();
    let translated = state
        .cache
        .get_or_fetch(&key, || async move { ai.generate(&messages).await })
        .await
        .map_err(|e| ApiError::AiError(e.to_string()))?;

    Ok(Json(TranslateResponse {
        translated,
        target_language: target,
        source_language: request.source_language,
    }))
}

/// Translate an uploaded document (PDF/DOCX/TXT): extract the text, then
/// run it through the same translation path.
pub async fn translate_document(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    mut multipart: Multipart,
) -> Result<Json<DocumentTranslateResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut target_language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
                        .to_vec(),
                );
            }
            "target_language" => {
                target_language = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| {
                            ApiError::BadRequest(format!("Invalid target_language: {}", e))
                        })?
                        .trim()
                        .to_string(),
                );
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::BadRequest("file required".to_string()))?;
    let file_name =
        file_name.ok_or_else(|| ApiError::BadRequest("filename required".to_string()))?;
    let target = target_language
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("target_language required".to_string()))?;

    info!(
        "Document translation: session={}, file={}, bytes={}, target={}",
        current.0.id,
        file_name,
        file_data.len(),
        target
    );

    let parsed = DocumentParser::parse(&file_name, &file_data)
        .map_err(|e| ApiError::BadRequest(format!("Failed to parse document: {}", e)))?;

    let content = parsed.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::BadRequest(
            "Document contains no extractable text".to_string(),
        ));
    }
    if content.chars().count() > MAX_TEXT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Extracted text exceeds {} characters",
            MAX_TEXT_CHARS
        )));
    }

    debug!("Extracted {} chars from {}", content.len(), file_name);

    let messages =
        build_translation_messages(&state.settings.prompts.translator, &content, &target, None);

    let translated = state
        .ai
        .generate(&messages)
        .await
        .map_err(|e| ApiError::AiError(e.to_string()))?;

    Ok(Json(DocumentTranslateResponse {
        file_name,
        file_type: parsed.metadata.file_type,
        char_count: parsed.metadata.char_count,
        translated,
        target_language: target,
    }))
}
