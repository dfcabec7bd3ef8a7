use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::Settings;
use crate::services::{AiProvider, SpeechProvider};
use crate::session::SessionStore;
use crate::utils::{cache::CacheManager, rate_limit::CooldownLimiter};

/// Application state shared across handlers. The AI and TTS upstreams sit
/// behind trait objects so tests can swap in mocks.
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub sessions: Arc<SessionStore>,
    pub cache: Arc<CacheManager<String>>,
    pub limiter: Arc<CooldownLimiter>,
    pub ai: Arc<dyn AiProvider>,
    pub tts: Arc<dyn SpeechProvider>,
}

impl FromRef<AppState> for Arc<SessionStore> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<CacheManager<String>> {
    fn from_ref(state: &AppState) -> Self {
        state.cache.clone()
    }
}

impl FromRef<AppState> for Arc<CooldownLimiter> {
    fn from_ref(state: &AppState) -> Self {
        state.limiter.clone()
    }
}
