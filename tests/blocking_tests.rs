//! Integration tests for the blocking client.
//!
//! The mock server runs on its own tokio runtime while the client is driven
//! from the plain test thread.

use http::StatusCode;
use openrobot_api::rate_limit::RateLimitConfig;
use openrobot_api::{BlockingClient, Error, MediaInput, Tries};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    runtime: Runtime,
    server: Option<MockServer>,
}

impl Harness {
    fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self {
            runtime,
            server: Some(server),
        }
    }

    fn server(&self) -> &MockServer {
        self.server.as_ref().unwrap()
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(self.server()));
    }

    fn received(&self) -> usize {
        self.runtime
            .block_on(self.server().received_requests())
            .unwrap()
            .len()
    }

    fn client(&self, rate_limit: RateLimitConfig) -> BlockingClient {
        BlockingClient::builder()
            .token("test-token")
            .base_url(format!("{}/api/", self.server().uri()))
            .unwrap()
            .allowed_hosts(r"^http://127\.0\.0\.1:\d+/")
            .unwrap()
            .rate_limit_config(rate_limit)
            .build_blocking()
            .unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        // The server has to shut down while its runtime is still alive.
        if let Some(server) = self.server.take() {
            let _guard = self.runtime.enter();
            drop(server);
        }
    }
}

#[test]
fn test_blocking_speech_to_text_upload() {
    let harness = Harness::start();

    harness.mount(
        Mock::given(method("POST"))
            .and(path("/api/speech/speech-to-text"))
            .and(query_param("language_code", "en-US"))
            .and(header("authorization", "test-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"text": "hello", "duration": 1.5})),
            ),
    );

    let response = harness
        .client(RateLimitConfig::default())
        .speech_to_text(MediaInput::file(b"RIFF....WAVE".to_vec()), "en-US")
        .unwrap();

    assert_eq!(response.text, "hello");
    assert_eq!(response.duration, 1.5);
    assert_eq!(harness.received(), 1);
}

#[test]
fn test_blocking_forbidden() {
    let harness = Harness::start();

    harness.mount(
        Mock::given(method("GET"))
            .and(path("/api/description"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"message": "nope", "error": {"code": 12}})),
            ),
    );

    let error = harness
        .client(RateLimitConfig::default())
        .description(MediaInput::url("https://example.com/a.png"))
        .unwrap_err();

    assert!(matches!(error, Error::Forbidden { .. }));
    assert_eq!(error.message(), Some("nope"));
    assert_eq!(error.error_code(), Some(12));
    assert_eq!(error.status(), Some(StatusCode::FORBIDDEN));
}

#[test]
fn test_blocking_rate_limit_retries() {
    let harness = Harness::start();

    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    harness.mount(
        Mock::given(method("GET"))
            .and(path("/api/summarization/t1"))
            .respond_with(move |_req: &wiremock::Request| {
                if attempt_count_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(429)
                        .insert_header("retry-after", "0.1")
                        .set_body_json(json!({"message": "Rate limited"}))
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({
                        "task_id": "t1",
                        "text": "long text",
                        "max_length": 50,
                        "min_length": 10,
                        "status": "COMPLETED",
                        "result": [{"summary_text": "short"}],
                        "timestamp": 1650000000.0
                    }))
                }
            }),
    );

    let start = std::time::Instant::now();
    let response = harness
        .client(RateLimitConfig::default())
        .summarization_result("t1")
        .unwrap();

    assert_eq!(response.result.as_deref(), Some("short"));
    assert_eq!(response.attempts, 3);
    assert!(start.elapsed() >= Duration::from_millis(180));
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
}

#[test]
fn test_blocking_rate_limit_exhausted() {
    let harness = Harness::start();

    harness.mount(
        Mock::given(method("GET"))
            .and(path("/api/translate/languages"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "0")
                    .set_body_json(json!({"message": "Rate limited"})),
            ),
    );

    let result = harness
        .client(RateLimitConfig::builder().tries(Tries::Limited(2)).build())
        .translate_languages();

    assert!(matches!(result, Err(Error::TooManyRequests { .. })));
    assert_eq!(harness.received(), 2);
}

#[test]
fn test_blocking_invalid_input_makes_no_request() {
    let harness = Harness::start();
    let client = harness.client(RateLimitConfig::default());

    assert!(matches!(
        client.ocr(MediaInput::default()),
        Err(Error::ConfigurationError(_))
    ));
    assert!(matches!(
        client.text_generation_result(""),
        Err(Error::ConfigurationError(_))
    ));
    assert_eq!(harness.received(), 0);
}
