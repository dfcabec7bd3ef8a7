use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::config::settings::{
    AiConfig, CacheConfig, PromptsConfig, RateLimitConfig, ServerConfig, SessionConfig, Settings,
    TtsConfig,
};
use crate::handlers;
use crate::services::ai_service::MockAiProvider;
use crate::services::tts_service::MockSpeechProvider;
use crate::session::SessionStore;
use crate::state::AppState;
use crate::utils::{cache::CacheManager, rate_limit::CooldownLimiter};

fn test_settings() -> Settings {
    Settings {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            sweep_interval_seconds: 300,
            max_upload_mb: 5,
        },
        session: SessionConfig {
            cookie_name: "prep_session".to_string(),
            ttl_seconds: 86400,
        },
        cache: CacheConfig { ttl_seconds: 3600 },
        rate_limit: RateLimitConfig { cooldown_ms: 0 },
        ai: AiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "test".to_string(),
            model: "test-model".to_string(),
            timeout_seconds: 5,
            max_tokens: 256,
            temperature: 0.7,
        },
        tts: TtsConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            voice: "alloy".to_string(),
            format: "mp3".to_string(),
            timeout_seconds: 5,
        },
        prompts: PromptsConfig {
            interviewer: "interviewer".to_string(),
            evaluator: "evaluator".to_string(),
            guidance: "guidance".to_string(),
            cover_letter: "cover letter".to_string(),
            cv_optimizer: "cv".to_string(),
            translator: "translator".to_string(),
            detector: "detector".to_string(),
            character: "character".to_string(),
            writing_coach: "writing".to_string(),
        },
    }
}

fn test_app(ai: MockAiProvider, tts: MockSpeechProvider, cooldown_ms: u64) -> Router {
    let mut settings = test_settings();
    settings.rate_limit.cooldown_ms = cooldown_ms;

    let state = AppState {
        sessions: Arc::new(SessionStore::new(Duration::from_secs(
            settings.session.ttl_seconds,
        ))),
        cache: Arc::new(CacheManager::new(Duration::from_secs(
            settings.cache.ttl_seconds,
        ))),
        limiter: Arc::new(CooldownLimiter::new(Duration::from_millis(cooldown_ms))),
        ai: Arc::new(ai),
        tts: Arc::new(tts),
        settings,
    };

    handlers::router(state)
}

fn post_json(uri: &str, body: Value, ip: [u8; 4]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .extension(ConnectInfo(SocketAddr::from((ip, 40000))))
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app(MockAiProvider::new(), MockSpeechProvider::new(), 0);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_question_generation_sets_session_cookie() {
    let mut ai = MockAiProvider::new();
    ai.expect_generate().returning(|_| {
        Ok(r#"[{"text": "Why Rust?", "category": "technical"},
               {"text": "Why us?", "category": "motivation"}]"#
            .to_string())
    });

    let app = test_app(ai, MockSpeechProvider::new(), 0);

    let response = app
        .oneshot(post_json(
            "/api/interview/questions",
            json!({"jd_text": "Senior Rust engineer, distributed systems."}),
            [10, 0, 0, 1],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("new client must receive a session cookie");
    assert!(cookie.starts_with("prep_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    let body = body_json(response).await;
    let questions = body["questions"].as_array().expect("questions array");
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["id"], 1);
    assert_eq!(questions[1]["id"], 2);
}

#[tokio::test]
async fn test_empty_jd_rejected_without_upstream_call() {
    // No expectations set: any AI call would panic the mock
    let app = test_app(MockAiProvider::new(), MockSpeechProvider::new(), 0);

    let response = app
        .oneshot(post_json(
            "/api/interview/questions",
            json!({"jd_text": "   "}),
            [10, 0, 0, 2],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cooldown_rejects_second_request() {
    let mut ai = MockAiProvider::new();
    ai.expect_generate()
        .returning(|_| Ok(r#"["Why Rust?"]"#.to_string()));

    let app = test_app(ai, MockSpeechProvider::new(), 5000);

    let first = app
        .clone()
        .oneshot(post_json(
            "/api/interview/questions",
            json!({"jd_text": "Rust engineer"}),
            [10, 0, 0, 3],
        ))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(post_json(
            "/api/interview/questions",
            json!({"jd_text": "Rust engineer"}),
            [10, 0, 0, 3],
        ))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        second
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok()),
        Some("5")
    );
}

#[tokio::test]
async fn test_identical_translations_hit_cache() {
    let mut ai = MockAiProvider::new();
    // The memoized upstream call must happen exactly once
    ai.expect_generate()
        .times(1)
        .returning(|_| Ok("Hallo Welt".to_string()));

    let app = test_app(ai, MockSpeechProvider::new(), 0);
    let body = json!({"text": "Hello world", "target_language": "German"});

    for ip_tail in [10, 11] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/translate/text",
                body.clone(),
                [10, 0, 0, ip_tail],
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["translated"], "Hallo Welt");
    }
}

#[tokio::test]
async fn test_answer_without_questions_is_not_found() {
    let app = test_app(MockAiProvider::new(), MockSpeechProvider::new(), 0);

    let response = app
        .oneshot(post_json(
            "/api/interview/answer",
            json!({"question_id": 1, "answer": "I would use channels."}),
            [10, 0, 0, 4],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_detect_parses_verdict_json() {
    let mut ai = MockAiProvider::new();
    ai.expect_generate().returning(|_| {
        Ok(r#"{"ai_probability": 1.4, "verdict": "likely AI", "rationale": "too uniform"}"#
            .to_string())
    });

    let app = test_app(ai, MockSpeechProvider::new(), 0);

    let response = app
        .oneshot(post_json(
            "/api/detect",
            json!({"text": "a".repeat(100)}),
            [10, 0, 0, 5],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    // Out-of-range probability from the model gets clamped
    assert_eq!(body["ai_probability"], 1.0);
    assert_eq!(body["verdict"], "likely AI");
}

#[tokio::test]
async fn test_speak_returns_base64_audio() {
    let mut tts = MockSpeechProvider::new();
    tts.expect_synthesize()
        .returning(|_, _| Ok(vec![1u8, 2, 3, 4]));
    tts.expect_audio_format().return_const("mp3".to_string());

    let app = test_app(MockAiProvider::new(), tts, 0);

    let response = app
        .oneshot(post_json(
            "/api/character/speak",
            json!({"text": "Hello there!"}),
            [10, 0, 0, 6],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["audio_base64"], BASE64.encode([1u8, 2, 3, 4]));
    assert_eq!(body["format"], "mp3");
}

#[tokio::test]
async fn test_upstream_failure_propagates_as_service_error() {
    let mut ai = MockAiProvider::new();
    ai.expect_generate()
        .returning(|_| Err(anyhow::anyhow!("model offline")));

    let app = test_app(ai, MockSpeechProvider::new(), 0);

    let response = app
        .oneshot(post_json(
            "/api/writing/evaluate",
            json!({"text": "This is my practice essay about distributed systems."}),
            [10, 0, 0, 7],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_character_chat_streams_deltas_then_done() {
    let mut ai = MockAiProvider::new();
    ai.expect_generate_stream().returning(|_| {
        let deltas: Vec<anyhow::Result<String>> =
            vec![Ok("Hello".to_string()), Ok(" there".to_string())];
        Ok(Box::pin(futures::stream::iter(deltas)) as crate::services::ai_service::TextStream)
    });

    let app = test_app(ai, MockSpeechProvider::new(), 0);

    let response = app
        .oneshot(post_json(
            "/api/character/chat",
            json!({"message": "Introduce yourself."}),
            [10, 0, 0, 20],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = String::from_utf8(bytes.to_vec()).expect("utf8 body");

    // Every mocked delta arrives as a message event, then the terminal marker
    assert!(body.contains(r#"{"delta":"Hello"}"#), "body: {}", body);
    assert!(body.contains(r#"{"delta":" there"}"#), "body: {}", body);
    assert!(body.contains("event: done"), "body: {}", body);
}

fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &str)], ip: [u8; 4]) -> Request<Body> {
    let boundary = "X-PREP-TEST-BOUNDARY";
    let mut body = String::new();
    for (name, file_name, value) in parts {
        body.push_str(&format!("--{}\r\n", boundary));
        match file_name {
            Some(file_name) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\r\n",
                name, file_name
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                name
            )),
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", boundary));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .extension(ConnectInfo(SocketAddr::from((ip, 40000))))
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn test_document_translation_extracts_and_translates() {
    let mut ai = MockAiProvider::new();
    ai.expect_generate()
        .times(1)
        .returning(|_| Ok("Hallo Welt".to_string()));

    let app = test_app(ai, MockSpeechProvider::new(), 0);

    let response = app
        .oneshot(multipart_request(
            "/api/translate/document",
            &[
                ("file", Some("notes.txt"), "Hello world"),
                ("target_language", None, "German"),
            ],
            [10, 0, 0, 21],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["translated"], "Hallo Welt");
    assert_eq!(body["file_name"], "notes.txt");
    assert_eq!(body["target_language"], "German");
}

#[tokio::test]
async fn test_document_translation_requires_target_language() {
    // No expectations set: the upstream must not be called for a bad upload
    let app = test_app(MockAiProvider::new(), MockSpeechProvider::new(), 0);

    let response = app
        .oneshot(multipart_request(
            "/api/translate/document",
            &[("file", Some("notes.txt"), "Hello world")],
            [10, 0, 0, 22],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_detect_minimum_counts_characters_not_bytes() {
    // 30 two-byte characters: over the minimum in bytes, under it in chars
    let app = test_app(MockAiProvider::new(), MockSpeechProvider::new(), 0);

    let response = app
        .oneshot(post_json(
            "/api/detect",
            json!({"text": "ä".repeat(30)}),
            [10, 0, 0, 23],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_reuse_with_cookie() {
    let mut ai = MockAiProvider::new();
    ai.expect_generate()
        .returning(|_| Ok(r#"["Why Rust?"]"#.to_string()));

    let app = test_app(ai, MockSpeechProvider::new(), 0);

    let first = app
        .clone()
        .oneshot(post_json(
            "/api/interview/questions",
            json!({"jd_text": "Rust engineer"}),
            [10, 0, 0, 8],
        ))
        .await
        .expect("response");
    let cookie = first
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("cookie")
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string();

    // Answer the generated question in the same session
    let mut request = post_json(
        "/api/interview/answer",
        json!({"question_id": 1, "answer": "Because of ownership and fearless concurrency."}),
        [10, 0, 0, 8],
    );
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().expect("cookie header"));

    let second = app.oneshot(request).await.expect("response");
    assert_eq!(second.status(), StatusCode::OK);
    // A resolved session must not set a fresh cookie
    assert!(second.headers().get(header::SET_COOKIE).is_none());

    let body = body_json(second).await;
    assert_eq!(body["question_id"], 1);
    assert_eq!(body["question"], "Why Rust?");
}
