use axum::{
    extract::{Extension, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use tracing::{info, warn};

use crate::models::chat::ChatMessage;
use crate::models::tools::{CharacterChatRequest, CharacterChunk, SpeakRequest, SpeakResponse};
use crate::session::CurrentSession;
use crate::state::AppState;
use crate::utils::error::ApiError;

const MAX_MESSAGE_CHARS: usize = 4_000;
const MAX_HISTORY_TURNS: usize = 10;
const MAX_SPEAK_CHARS: usize = 1_000;

fn create_sse_event<T: Serialize>(event: &str, data: &T) -> Event {
    Event::default()
        .event(event.to_string())
        .json_data(data)
        .unwrap_or_else(|_| Event::default().event("error").data("serialization failed"))
}

#[derive(Serialize)]
struct StreamError {
    message: String,
}

#[derive(Serialize)]
struct StreamDone {}

/// Chat with the virtual character, streaming reply deltas over SSE.
/// History is client-held; only the last few turns are forwarded upstream.
pub async fn chat(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<CharacterChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "message exceeds {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    info!(
        "Character chat: session={}, message_len={}, history={}",
        current.0.id,
        message.len(),
        request.history.len()
    );

    let mut messages = vec![ChatMessage::system(&state.settings.prompts.character)];
    let skip = request.history.len().saturating_sub(MAX_HISTORY_TURNS);
    messages.extend(request.history.into_iter().skip(skip));
    messages.push(ChatMessage::user(message));

    let ai = state.ai.clone();

    let stream = async_stream::stream! {
        use futures::StreamExt;

        match ai.generate_stream(&messages).await {
            Ok(mut deltas) => {
                while let Some(item) = deltas.next().await {
                    match item {
                        Ok(delta) => {
                            if !delta.is_empty() {
                                yield Ok(create_sse_event("message", &CharacterChunk { delta }));
                            }
                        }
                        Err(e) => {
                            warn!("Character stream error: {}", e);
                            yield Ok(create_sse_event("error", &StreamError {
                                message: e.to_string(),
                            }));
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Character stream failed to start: {}", e);
                yield Ok(create_sse_event("error", &StreamError {
                    message: e.to_string(),
                }));
            }
        }

        yield Ok(create_sse_event("done", &StreamDone {}));
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Synthesize character speech, returned as base64 so the JSON surface
/// stays uniform with the other features.
pub async fn speak(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(request): Json<SpeakRequest>,
) -> Result<Json<SpeakResponse>, ApiError> {
    let text = request.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }
    if text.chars().count() > MAX_SPEAK_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text exceeds {} characters",
            MAX_SPEAK_CHARS
        )));
    }

    let voice = request
        .voice
        .unwrap_or_else(|| state.settings.tts.voice.clone());

    info!(
        "TTS: session={}, chars={}, voice={}",
        current.0.id,
        text.len(),
        voice
    );

    let audio = state
        .tts
        .synthesize(&text, &voice)
        .await
        .map_err(|e| ApiError::TtsError(e.to_string()))?;

    Ok(Json(SpeakResponse {
        audio_base64: BASE64.encode(audio),
        format: state.tts.audio_format(),
    }))
}
