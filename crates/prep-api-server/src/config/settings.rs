use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub ai: AiConfig,
    pub tts: TtsConfig,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// "production" enables the Secure cookie attribute.
    pub environment: String,
    /// Interval for the background sweep of sessions/cache/rate-limit maps.
    /// The stores never self-schedule; without this sweeper they grow
    /// unbounded.
    pub sweep_interval_seconds: u64,
    pub max_upload_mb: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    pub cooldown_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: usize,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TtsConfig {
    pub base_url: String,
    pub voice: String,
    pub format: String,
    pub timeout_seconds: u64,
}

/// System prompts, one per feature. Kept in config so they can be tuned
/// without a rebuild.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptsConfig {
    pub interviewer: String,
    pub evaluator: String,
    pub guidance: String,
    pub cover_letter: String,
    pub cv_optimizer: String,
    pub translator: String,
    pub detector: String,
    pub character: String,
    pub writing_coach: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(true))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == "production"
    }
}
