//! The request pipeline shared by [`crate::Client`] and [`crate::BlockingClient`].
//!
//! Everything here is synchronous and free of I/O. A client binding asks the
//! pipeline to [`prepare`](Pipeline::prepare) a request, performs the HTTP
//! round-trip with its own transport, and hands the result back to
//! [`interpret`](Pipeline::interpret), which either finishes the call or tells
//! the binding how long to wait before dispatching again. The wait itself is
//! the only thing that differs between the blocking and the async client.

use crate::error::ErrorResponse;
use crate::rate_limit::{RateLimitConfig, RateLimitInfo};
use crate::request::Request;
use crate::response::{decode_body, Body, RawResponse, Response};
use crate::retry::RetryBudget;
use crate::{Error, Result};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use regex::Regex;
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

/// Client-wide settings applied to every call.
#[derive(Debug)]
pub(crate) struct Pipeline {
    pub token: HeaderValue,
    pub base_url: Url,
    pub allowed_hosts: Regex,
    pub default_headers: HeaderMap,
    pub timeout: Option<Duration>,
    pub rate_limit: RateLimitConfig,
}

/// A request with its final URL and headers resolved.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

/// What a binding should do after an attempt.
#[derive(Debug)]
pub(crate) enum Step {
    Done(Response<Body>),
    Wait(Duration),
}

impl Pipeline {
    /// Resolves the target URL and headers. Fails before any dispatch when
    /// the target is outside the allowed hosts.
    pub(crate) fn prepare(&self, request: &Request) -> Result<Prepared> {
        let mut url = self.target_url(&request.path)?;
        for (key, value) in &request.query_params {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(Prepared {
            method: request.method.clone(),
            url,
            headers: self.headers(request),
        })
    }

    fn target_url(&self, path: &str) -> Result<Url> {
        let path = path.strip_prefix('/').unwrap_or(path);

        let url = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)
        } else {
            let path = path.strip_prefix("api/").unwrap_or(path);
            self.base_url.join(path)
        }
        .map_err(|e| Error::ConfigurationError(format!("invalid URL {:?}: {}", path, e)))?;

        if !self.allowed_hosts.is_match(url.as_str()) {
            return Err(Error::ConfigurationError(format!(
                "invalid URL {}: host does not match {}",
                url,
                self.allowed_hosts.as_str()
            )));
        }

        Ok(url)
    }

    fn headers(&self, request: &Request) -> HeaderMap {
        let mut headers = self.default_headers.clone();
        headers.extend(request.headers.clone());
        if !headers.contains_key(AUTHORIZATION) {
            headers.insert(AUTHORIZATION, self.token.clone());
        }
        headers
    }

    /// Decodes a response and maps its status to success, a wait, or an error.
    pub(crate) fn interpret(
        &self,
        request: &Request,
        raw: RawResponse,
        budget: &RetryBudget,
        started: Instant,
    ) -> Result<Step> {
        let status = raw.status;
        let latency = started.elapsed();
        let body = decode_body(&raw.headers, &raw.bytes);

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            attempt = budget.attempts(),
            "Received HTTP response"
        );

        if request.expect_json && !body.is_json() {
            let content_type = raw.content_type().map(str::to_string);
            tracing::error!(
                status = status.as_u16(),
                content_type = ?content_type,
                "Expected a JSON response"
            );
            let text = raw.text();
            return Err(Error::UnexpectedContentType {
                content_type,
                body: text,
                response: snapshot(raw, body),
            });
        }

        if request.accept_statuses.contains(&status) {
            return Ok(Step::Done(finish(raw, body, latency, budget)));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return self.rate_limited(raw, body, budget);
        }

        if status.is_success() {
            return Ok(Step::Done(finish(raw, body, latency, budget)));
        }

        let (message, error_code) = api_message(&body, status);
        if status.is_client_error() {
            tracing::error!(status = status.as_u16(), message = %message, "Client error (4xx)");
        } else if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), message = %message, "Server error (5xx)");
        }

        let response = snapshot(raw, body);
        Err(match status {
            StatusCode::FORBIDDEN => Error::Forbidden {
                message,
                error_code,
                response,
            },
            StatusCode::BAD_REQUEST => Error::BadRequest {
                message,
                error_code,
                response,
            },
            StatusCode::INTERNAL_SERVER_ERROR => Error::InternalServerError {
                message,
                error_code,
                response,
            },
            _ => Error::Api {
                status,
                message,
                response,
            },
        })
    }

    fn rate_limited(&self, raw: RawResponse, body: Body, budget: &RetryBudget) -> Result<Step> {
        let info = RateLimitInfo::from_headers(&raw.headers);

        if self.rate_limit.enabled {
            let retry_after = info.retry_after.ok_or_else(|| {
                Error::ConfigurationError(
                    "received 429 without a valid Retry-After header".to_string(),
                )
            })?;

            if budget.can_retry() {
                let delay = self.rate_limit.cap(retry_after);
                tracing::info!(
                    delay_ms = delay.as_millis(),
                    attempt = budget.attempts(),
                    remaining = ?info.remaining,
                    reset_at = ?info.reset_at,
                    "Rate limited - waiting before retry"
                );
                return Ok(Step::Wait(delay));
            }

            tracing::warn!(
                attempts = budget.attempts(),
                "Rate limited - try budget exhausted"
            );
        }

        let (message, error_code) = api_message(&body, raw.status);
        Err(Error::TooManyRequests {
            message,
            error_code,
            retry_after: info.retry_after,
            response: snapshot(raw, body),
        })
    }
}

fn finish(raw: RawResponse, body: Body, latency: Duration, budget: &RetryBudget) -> Response<Body> {
    let raw_body = raw.text();
    Response::new(
        body,
        raw_body,
        raw.status,
        raw.headers,
        latency,
        budget.attempts(),
    )
}

fn snapshot(raw: RawResponse, body: Body) -> Box<ErrorResponse> {
    Box::new(ErrorResponse {
        status: raw.status,
        headers: raw.headers,
        body,
    })
}

/// Pulls `message` and `error.code` out of an API error body.
fn api_message(body: &Body, status: StatusCode) -> (String, Option<i64>) {
    let reason = || status.canonical_reason().unwrap_or("unknown status").to_string();
    match body {
        Body::Json(value) => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(reason);
            let code = value.pointer("/error/code").and_then(Value::as_i64);
            (message, code)
        }
        Body::Text(text) if !text.trim().is_empty() => (text.trim().to_string(), None),
        Body::Text(_) => (reason(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Tries;
    use http::header::CONTENT_TYPE;
    use serde_json::json;

    fn pipeline(rate_limit: RateLimitConfig) -> Pipeline {
        Pipeline {
            token: HeaderValue::from_static("secret"),
            base_url: Url::parse("https://api.openrobot.xyz/api/").unwrap(),
            allowed_hosts: Regex::new(crate::DEFAULT_ALLOWED_HOSTS).unwrap(),
            default_headers: HeaderMap::new(),
            timeout: None,
            rate_limit,
        }
    }

    fn raw(status: u16, headers: &[(&'static str, &'static str)], body: &str) -> RawResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: map,
            bytes: body.as_bytes().to_vec(),
        }
    }

    fn json_raw(status: u16, body: Value) -> RawResponse {
        let mut raw = raw(status, &[], &body.to_string());
        raw.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        raw
    }

    fn first_attempt(tries: Tries) -> RetryBudget {
        let mut budget = RetryBudget::new(tries);
        budget.begin_attempt();
        budget
    }

    fn run(pipeline: &Pipeline, request: &Request, raw: RawResponse) -> Result<Step> {
        pipeline.interpret(request, raw, &first_attempt(Tries::Limited(3)), Instant::now())
    }

    #[test]
    fn test_url_normalization() {
        let p = pipeline(RateLimitConfig::default());
        for path in ["/api/celebrity", "api/celebrity", "/celebrity", "celebrity"] {
            let prepared = p.prepare(&Request::new(Method::GET, path)).unwrap();
            assert_eq!(prepared.url.as_str(), "https://api.openrobot.xyz/api/celebrity");
        }
    }

    #[test]
    fn test_query_params_are_encoded() {
        let p = pipeline(RateLimitConfig::default());
        let request = Request::new(Method::GET, "/api/translate")
            .with_query_param("text", "hello world")
            .with_query_param("to_lang", "es");
        let prepared = p.prepare(&request).unwrap();
        assert_eq!(
            prepared.url.as_str(),
            "https://api.openrobot.xyz/api/translate?text=hello+world&to_lang=es"
        );
    }

    #[test]
    fn test_absolute_url_on_allowed_host() {
        let p = pipeline(RateLimitConfig::default());
        let request = Request::new(Method::GET, "https://lyrics.ayomerdeka.com/lyrics/x");
        let prepared = p.prepare(&request).unwrap();
        assert_eq!(prepared.url.host_str(), Some("lyrics.ayomerdeka.com"));
    }

    #[test]
    fn test_disallowed_host_is_configuration_error() {
        let p = pipeline(RateLimitConfig::default());
        let request = Request::new(Method::GET, "https://evil.example.com/api/celebrity");
        assert!(matches!(p.prepare(&request), Err(Error::ConfigurationError(_))));

        let mut p = pipeline(RateLimitConfig::default());
        p.allowed_hosts = Regex::new(r"^https://elsewhere\.invalid/").unwrap();
        let request = Request::new(Method::GET, "api/celebrity");
        match p.prepare(&request) {
            Err(Error::ConfigurationError(message)) => assert!(message.contains("invalid URL")),
            other => panic!("Expected ConfigurationError, got {:?}", other),
        }
    }

    #[test]
    fn test_authorization_header_added() {
        let p = pipeline(RateLimitConfig::default());
        let request = Request::new(Method::GET, "ocr").with_header("X-Extra", "1").unwrap();
        let prepared = p.prepare(&request).unwrap();
        assert_eq!(prepared.headers.get(AUTHORIZATION).unwrap(), "secret");
        assert_eq!(prepared.headers.get("x-extra").unwrap(), "1");
    }

    #[test]
    fn test_caller_authorization_wins() {
        let p = pipeline(RateLimitConfig::default());
        let request = Request::new(Method::GET, "ocr")
            .with_header("Authorization", "other")
            .unwrap();
        let prepared = p.prepare(&request).unwrap();
        let values: Vec<&str> = prepared
            .headers
            .get_all(AUTHORIZATION)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["other"]);
    }

    #[test]
    fn test_success_statuses() {
        let p = pipeline(RateLimitConfig::default());
        let request = Request::new(Method::GET, "ocr");
        for status in [200, 201, 204, 299] {
            match run(&p, &request, json_raw(status, json!({"text": "hi"}))).unwrap() {
                Step::Done(response) => {
                    assert_eq!(response.status.as_u16(), status);
                    assert_eq!(response.data, Body::Json(json!({"text": "hi"})));
                    assert_eq!(response.attempts, 1);
                }
                Step::Wait(_) => panic!("unexpected wait"),
            }
        }
    }

    #[test]
    fn test_forbidden_extracts_message_and_code() {
        let p = pipeline(RateLimitConfig::default());
        let body = json!({"message": "nope", "error": {"code": 12}});
        match run(&p, &Request::default(), json_raw(403, body.clone())) {
            Err(Error::Forbidden {
                message,
                error_code,
                response,
            }) => {
                assert_eq!(message, "nope");
                assert_eq!(error_code, Some(12));
                assert_eq!(response.body, Body::Json(body));
            }
            other => panic!("Expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_request_and_server_error() {
        let p = pipeline(RateLimitConfig::default());
        let body = json!({"message": "bad", "error": {"code": 3}});
        assert!(matches!(
            run(&p, &Request::default(), json_raw(400, body.clone())),
            Err(Error::BadRequest { error_code: Some(3), .. })
        ));
        assert!(matches!(
            run(&p, &Request::default(), json_raw(500, body)),
            Err(Error::InternalServerError { error_code: Some(3), .. })
        ));
    }

    #[test]
    fn test_missing_message_falls_back_to_reason() {
        let p = pipeline(RateLimitConfig::default());
        match run(&p, &Request::default(), json_raw(403, json!({}))) {
            Err(Error::Forbidden { message, error_code, .. }) => {
                assert_eq!(message, "Forbidden");
                assert_eq!(error_code, None);
            }
            other => panic!("Expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_other_status_is_generic() {
        let p = pipeline(RateLimitConfig::default());
        match run(&p, &Request::default(), json_raw(404, json!({"message": "gone"}))) {
            Err(Error::Api { status, message, .. }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "gone");
            }
            other => panic!("Expected Api, got {:?}", other),
        }
    }

    /// A JSON 429, optionally carrying `Retry-After`.
    fn limited(retry_after: Option<&'static str>) -> RawResponse {
        let mut raw = json_raw(429, json!({"message": "slow down", "error": {"code": 7}}));
        if let Some(value) = retry_after {
            raw.headers
                .insert("retry-after", HeaderValue::from_static(value));
        }
        raw
    }

    #[test]
    fn test_accept_status_bypasses_mapping() {
        let p = pipeline(RateLimitConfig::default());
        let request = Request::default()
            .accept_status(StatusCode::NOT_FOUND)
            .accept_status(StatusCode::TOO_MANY_REQUESTS);

        assert!(matches!(
            run(&p, &request, json_raw(404, json!({"message": "missing"}))),
            Ok(Step::Done(_))
        ));
        // No Retry-After needed either.
        assert!(matches!(run(&p, &request, limited(None)), Ok(Step::Done(_))));

        let text = request.clone().allow_text();
        assert!(matches!(
            run(&p, &text, raw(404, &[], "missing")),
            Ok(Step::Done(_))
        ));
        assert!(matches!(run(&p, &text, raw(429, &[], "")), Ok(Step::Done(_))));
    }

    #[test]
    fn test_text_body_is_unexpected_content_type() {
        let p = pipeline(RateLimitConfig::default());
        match run(&p, &Request::default(), raw(200, &[("content-type", "text/html")], "<html>")) {
            Err(Error::UnexpectedContentType {
                content_type, body, ..
            }) => {
                assert_eq!(content_type.as_deref(), Some("text/html"));
                assert_eq!(body, "<html>");
            }
            other => panic!("Expected UnexpectedContentType, got {:?}", other),
        }

        let request = Request::default().allow_text();
        match run(&p, &request, raw(200, &[], "plain")).unwrap() {
            Step::Done(response) => assert_eq!(response.data, Body::Text("plain".to_string())),
            Step::Wait(_) => panic!("unexpected wait"),
        }
    }

    #[test]
    fn test_text_body_checked_before_status() {
        let html = || {
            raw(
                429,
                &[("content-type", "text/html"), ("retry-after", "1")],
                "<html>slow</html>",
            )
        };

        for config in [RateLimitConfig::default(), RateLimitConfig::disabled()] {
            let p = pipeline(config);
            match run(&p, &Request::default(), html()) {
                Err(Error::UnexpectedContentType { body, response, .. }) => {
                    assert_eq!(body, "<html>slow</html>");
                    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
                }
                other => panic!("Expected UnexpectedContentType, got {:?}", other),
            }
        }

        let p = pipeline(RateLimitConfig::default());
        let accepted = Request::default().accept_status(StatusCode::NOT_FOUND);
        assert!(matches!(
            run(&p, &accepted, raw(404, &[("content-type", "text/html")], "<html>")),
            Err(Error::UnexpectedContentType { .. })
        ));

        // With text allowed the 429 is rate limited as usual.
        let text = Request::default().allow_text();
        assert!(matches!(
            run(&p, &text, html()),
            Ok(Step::Wait(d)) if d == Duration::from_secs(1)
        ));
    }

    #[test]
    fn test_rate_limit_waits_then_exhausts() {
        let p = pipeline(RateLimitConfig::builder().tries(Tries::Limited(2)).build());
        let request = Request::default();
        let mut budget = RetryBudget::new(Tries::Limited(2));

        budget.begin_attempt();
        let step = p
            .interpret(&request, limited(Some("3")), &budget, Instant::now())
            .unwrap();
        assert!(matches!(step, Step::Wait(d) if d == Duration::from_secs(3)));

        budget.begin_attempt();
        match p.interpret(&request, limited(Some("3")), &budget, Instant::now()) {
            Err(Error::TooManyRequests {
                message,
                error_code,
                retry_after,
                ..
            }) => {
                assert_eq!(message, "slow down");
                assert_eq!(error_code, Some(7));
                assert_eq!(retry_after, Some(Duration::from_secs(3)));
            }
            other => panic!("Expected TooManyRequests, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_limit_wait_is_capped() {
        let config = RateLimitConfig::builder()
            .max_wait(Duration::from_secs(1))
            .build();
        let p = pipeline(config);
        let step = run(&p, &Request::default(), limited(Some("600"))).unwrap();
        assert!(matches!(step, Step::Wait(d) if d == Duration::from_secs(1)));
    }

    #[test]
    fn test_rate_limit_disabled_fails_immediately() {
        let p = pipeline(RateLimitConfig::disabled());
        match run(&p, &Request::default(), limited(Some("10"))) {
            Err(Error::TooManyRequests { retry_after, .. }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(10)))
            }
            other => panic!("Expected TooManyRequests, got {:?}", other),
        }

        // Without the header too.
        assert!(matches!(
            run(&p, &Request::default(), limited(None)),
            Err(Error::TooManyRequests { retry_after: None, .. })
        ));
    }

    #[test]
    fn test_rate_limit_without_retry_after_is_configuration_error() {
        let p = pipeline(RateLimitConfig::default());
        assert!(matches!(
            run(&p, &Request::default(), limited(None)),
            Err(Error::ConfigurationError(_))
        ));
    }
}
