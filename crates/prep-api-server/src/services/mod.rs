pub mod ai_service;
pub mod tts_service;

pub use ai_service::{AiProvider, AiService};
pub use tts_service::{SpeechProvider, TtsService};
