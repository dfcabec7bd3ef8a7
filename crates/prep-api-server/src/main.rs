use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use prep_api_server::config::Settings;
use prep_api_server::handlers;
use prep_api_server::services::{AiService, TtsService};
use prep_api_server::session::SessionStore;
use prep_api_server::state::AppState;
use prep_api_server::utils::{cache::CacheManager, rate_limit::CooldownLimiter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,prep_api_server=debug".to_string()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("Starting prep API server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("Configuration loaded (environment: {})", settings.server.environment);

    // Core stores: plain in-memory maps, lost on restart by design
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(
        settings.session.ttl_seconds,
    )));
    let cache = Arc::new(CacheManager::new(Duration::from_secs(
        settings.cache.ttl_seconds,
    )));
    let limiter = Arc::new(CooldownLimiter::new(Duration::from_millis(
        settings.rate_limit.cooldown_ms,
    )));

    // Upstream services
    let ai = Arc::new(AiService::new(settings.ai.clone()));
    let tts = Arc::new(TtsService::new(settings.tts.clone()));

    let state = AppState {
        settings: settings.clone(),
        sessions: sessions.clone(),
        cache: cache.clone(),
        limiter: limiter.clone(),
        ai,
        tts,
    };

    // The stores never self-schedule eviction; this sweeper is the external
    // driver they require. Without it the maps grow unbounded.
    let sweep_interval = Duration::from_secs(settings.server.sweep_interval_seconds.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await; // First tick fires immediately, skip it
        loop {
            ticker.tick().await;
            let swept_sessions = sessions.cleanup();
            let swept_cache = cache.cleanup();
            let swept_keys = limiter.cleanup();
            debug!(
                "Sweep: {} sessions, {} cache entries, {} rate-limit keys",
                swept_sessions, swept_cache, swept_keys
            );
        }
    });
    info!("Background sweeper started (every {:?})", sweep_interval);

    // Build router
    let app = handlers::router(state);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
