use serde::{Deserialize, Serialize};

use super::chat::ChatMessage;

// ===== TRANSLATION =====

#[derive(Debug, Deserialize)]
pub struct TranslateTextRequest {
    pub text: String,
    pub target_language: String,
    #[serde(default)]
    pub source_language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub translated: String,
    pub target_language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentTranslateResponse {
    pub file_name: String,
    pub file_type: String,
    pub char_count: usize,
    pub translated: String,
    pub target_language: String,
}

// ===== AI-CONTENT DETECTION =====

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    /// 0.0 = almost certainly human, 1.0 = almost certainly AI-generated.
    pub ai_probability: f32,
    pub verdict: String,
    pub rationale: String,
}

// ===== VIRTUAL CHARACTER =====

#[derive(Debug, Deserialize)]
pub struct CharacterChatRequest {
    pub message: String,
    /// Prior turns, client-held; the server keeps no character history.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct CharacterChunk {
    pub delta: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpeakResponse {
    pub audio_base64: String,
    pub format: String,
}

// ===== WRITING PRACTICE =====

#[derive(Debug, Deserialize)]
pub struct WritingRequest {
    pub text: String,
    /// e.g. "essay", "formal-letter", "email"
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WritingResponse {
    pub feedback: String,
}
