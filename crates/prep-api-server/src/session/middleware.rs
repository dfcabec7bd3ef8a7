use axum::{
    extract::{Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::Session;
use crate::state::AppState;

/// Resolved session attached to request extensions for handlers.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

/// Resolve or create the session for each request.
/// A missing, garbage, or expired cookie never fails the request; it always
/// falls back to creating a fresh session and setting a new cookie.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.settings.session.cookie_name.clone();
    let existing_id = extract_cookie(request.headers(), &cookie_name);

    let (session, created) = match existing_id.and_then(|id| state.sessions.get(&id)) {
        Some(session) => {
            debug!("Resolved session {}", session.id);
            (session, false)
        }
        None => {
            let user_id = format!("anon-{}", Uuid::new_v4());
            let session = state.sessions.create(&user_id);
            debug!("Created session {} for new client", session.id);
            (session, true)
        }
    };

    let session_id = session.id.clone();
    request.extensions_mut().insert(CurrentSession(session));

    let mut response = next.run(request).await;

    if created {
        let cookie = build_session_cookie(
            &cookie_name,
            &session_id,
            state.settings.session.ttl_seconds,
            state.settings.is_production(),
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!("Failed to build session cookie header: {}", e),
        }
    }

    response
}

/// Extract a cookie value by name from the request headers.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for cookie in value.split(';') {
            let cookie = cookie.trim();
            if let Some(rest) = cookie.strip_prefix(name) {
                if let Some(val) = rest.strip_prefix('=') {
                    return Some(val.trim().to_string());
                }
            }
        }
    }
    None
}

fn build_session_cookie(name: &str, id: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        name, id, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_cookie_by_name() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; prep_session=abc-123; theme=dark"),
        );
        assert_eq!(
            extract_cookie(&headers, "prep_session").as_deref(),
            Some("abc-123")
        );
        assert_eq!(extract_cookie(&headers, "theme").as_deref(), Some("dark"));
        assert!(extract_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn test_extract_cookie_no_header() {
        let headers = HeaderMap::new();
        assert!(extract_cookie(&headers, "prep_session").is_none());
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = build_session_cookie("prep_session", "abc", 86400, false);
        assert!(cookie.starts_with("prep_session=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(!cookie.contains("Secure"));

        let secure = build_session_cookie("prep_session", "abc", 86400, true);
        assert!(secure.ends_with("; Secure"));
    }
}
