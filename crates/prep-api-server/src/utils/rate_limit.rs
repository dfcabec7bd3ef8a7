use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::{mapref::entry::Entry, DashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::state::AppState;
use crate::utils::error::ApiError;

/// Outcome of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

/// Per-client cooldown gate: at most one accepted request per cooldown
/// window per key. One timestamp per key; acceptance overwrites it,
/// rejection leaves it untouched.
#[derive(Clone)]
pub struct CooldownLimiter {
    last_accepted: Arc<DashMap<String, Instant>>,
    cooldown: Duration,
}

impl CooldownLimiter {
    pub fn new(cooldown: Duration) -> Self {
        info!("Initializing cooldown limiter (window: {:?})", cooldown);
        Self {
            last_accepted: Arc::new(DashMap::new()),
            cooldown,
        }
    }

    /// Check-and-record. The entry API holds the per-key shard lock across
    /// the read-modify-write, so two threads cannot both be accepted inside
    /// one window.
    pub fn check(&self, client_key: &str) -> RateDecision {
        let now = Instant::now();
        match self.last_accepted.entry(client_key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                RateDecision::Allowed
            }
            Entry::Occupied(mut occupied) => {
                let elapsed = now.duration_since(*occupied.get());
                if elapsed < self.cooldown {
                    let remaining = self.cooldown - elapsed;
                    // Round up to whole seconds for the client-facing wait
                    let retry_after_secs = remaining.as_millis().div_ceil(1000) as u64;
                    RateDecision::Limited { retry_after_secs }
                } else {
                    occupied.insert(now);
                    RateDecision::Allowed
                }
            }
        }
    }

    /// Drop keys idle longer than the cooldown window. Pure garbage
    /// collection; correctness of `check` does not depend on it.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.last_accepted.len();
        self.last_accepted
            .retain(|_, last| now.duration_since(*last) < self.cooldown);
        let removed = before.saturating_sub(self.last_accepted.len());
        if removed > 0 {
            debug!("Cleaned up {} stale rate-limit keys", removed);
        }
        removed
    }

    pub fn tracked_keys(&self) -> usize {
        self.last_accepted.len()
    }
}

/// Axum layer applying the per-IP cooldown to every route beneath it.
pub async fn cooldown_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client_key = addr.ip().to_string();

    match state.limiter.check(&client_key) {
        RateDecision::Allowed => Ok(next.run(request).await),
        RateDecision::Limited { retry_after_secs } => {
            warn!("Client {} hit cooldown, retry in {}s", client_key, retry_after_secs);
            Err(ApiError::RateLimited(retry_after_secs))
        }
    }
}
