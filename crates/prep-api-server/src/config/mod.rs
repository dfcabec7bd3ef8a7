pub mod settings;

pub use settings::{AiConfig, PromptsConfig, Settings, TtsConfig};
