use axum::{
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry in {0}s")]
    RateLimited(u64),

    #[error("AI error: {0}")]
    AiError(String),

    #[error("TTS error: {0}")]
    TtsError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, retry_after) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", msg, None)
            }
            ApiError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, "NotFound", msg, None)
            }
            ApiError::RateLimited(secs) => {
                tracing::warn!("Rate limited, retry in {}s", secs);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RateLimited",
                    format!("Too many requests, please wait {} second(s)", secs),
                    Some(secs),
                )
            }
            ApiError::AiError(msg) => {
                tracing::error!("AI error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "AiError", msg, None)
            }
            ApiError::TtsError(msg) => {
                tracing::error!("TTS error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "TtsError", msg, None)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg, None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::AiError(err.to_string())
    }
}
