use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::session;
use crate::state::AppState;
use crate::utils::rate_limit;

pub mod application;
pub mod character;
pub mod detect;
pub mod health;
pub mod interview;
pub mod translate;
pub mod writing;

/// Build the full application router.
/// Layer order on the /api tree (outermost first): session resolution, then
/// the per-IP cooldown, then the handler.
pub fn router(state: AppState) -> Router {
    // Public routes (no session, no cooldown)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Feature routes: every one terminates in an upstream AI/TTS call
    let api_routes = Router::new()
        .route("/api/interview/questions", post(interview::generate_questions))
        .route("/api/interview/answer", post(interview::evaluate_answer))
        .route("/api/interview/guidance", post(interview::guidance))
        .route("/api/application/cover-letter", post(application::cover_letter))
        .route("/api/application/cv", post(application::optimize_cv))
        .route("/api/translate/text", post(translate::translate_text))
        .route("/api/translate/document", post(translate::translate_document))
        .route("/api/detect", post(detect::detect))
        .route("/api/character/chat", post(character::chat))
        .route("/api/character/speak", post(character::speak))
        .route("/api/writing/evaluate", post(writing::evaluate))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::cooldown_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::middleware::session_middleware,
        ));

    let max_upload = state.settings.server.max_upload_mb * 1024 * 1024;

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(CatchPanicLayer::new())
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state)
}
