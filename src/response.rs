//! Response types and body decoding.
//!
//! Each transport binding turns its native response into a [`RawResponse`];
//! from there [`decode_body`] decides between structured JSON and plain text,
//! and the pipeline wraps the outcome into a [`Response`] that preserves the
//! HTTP metadata next to the data.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::{Error, Result};

/// A decoded response body.
///
/// The API nearly always answers with JSON, but proxies in front of it
/// sometimes strip or mis-set the `content-type` header or answer with an
/// HTML/text page. Those bodies are kept as [`Body::Text`].
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// The body parsed as JSON.
    Json(Value),
    /// The raw body text.
    Text(String),
}

impl Body {
    /// Returns `true` if the body parsed as JSON.
    pub fn is_json(&self) -> bool {
        matches!(self, Body::Json(_))
    }

    /// Returns the JSON value, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Text(_) => None,
        }
    }

    /// Returns the text, if the body did not parse as JSON.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Json(_) => None,
            Body::Text(text) => Some(text),
        }
    }
}

/// A transport response reduced to what the pipeline needs.
///
/// Built once per transport binding so the rest of the pipeline never touches
/// `reqwest` types.
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl RawResponse {
    pub(crate) async fn from_async(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(Error::transport)?;
        Ok(Self {
            status,
            headers,
            bytes: bytes.to_vec(),
        })
    }

    pub(crate) fn from_blocking(response: reqwest::blocking::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().map_err(Error::transport)?;
        Ok(Self {
            status,
            headers,
            bytes: bytes.to_vec(),
        })
    }

    /// The body as text, replacing invalid UTF-8.
    pub(crate) fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub(crate) fn content_type(&self) -> Option<&str> {
        content_type(&self.headers)
    }
}

/// Returns the `content-type` header value, if present and valid UTF-8.
pub(crate) fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE)?.to_str().ok()
}

fn is_json_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Decodes a response body according to its `content-type` header.
///
/// A JSON content type is parsed from the raw bytes first and, failing that,
/// from the lossy text with any BOM and surrounding whitespace removed. Every
/// other case, including a missing header, yields the text unchanged.
///
/// # Examples
///
/// ```
/// use http::{HeaderMap, HeaderValue};
/// use openrobot_api::{decode_body, Body};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("content-type", HeaderValue::from_static("application/json"));
/// assert_eq!(
///     decode_body(&headers, br#"{"text":"hi"}"#),
///     Body::Json(serde_json::json!({"text": "hi"}))
/// );
///
/// assert_eq!(
///     decode_body(&HeaderMap::new(), b"plain"),
///     Body::Text("plain".to_string())
/// );
/// ```
pub fn decode_body(headers: &HeaderMap, bytes: &[u8]) -> Body {
    let text = String::from_utf8_lossy(bytes);

    if !content_type(headers).is_some_and(is_json_media_type) {
        return Body::Text(text.into_owned());
    }

    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return Body::Json(value);
    }

    let trimmed = text.trim_start_matches('\u{feff}').trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Body::Json(value),
        Err(e) => {
            tracing::debug!(
                error = %e,
                "Response declared JSON but did not parse, keeping text"
            );
            Body::Text(text.into_owned())
        }
    }
}

/// A successful API response.
///
/// The pipeline returns `Response<Body>`; endpoint methods map it into
/// `Response<T>` for their typed result while keeping the metadata.
///
/// # Examples
///
/// ```no_run
/// use openrobot_api::{Client, MediaInput};
///
/// # async fn example() -> Result<(), openrobot_api::Error> {
/// let client = Client::builder().token("my-token").build()?;
///
/// let response = client.ocr(MediaInput::url("https://example.com/a.png")).await?;
///
/// println!("Text: {}", response.text);
/// println!("Request took {:?}", response.latency);
/// println!("Attempts: {}", response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded or typed response data.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The total latency of the call, including rate-limit waits.
    pub latency: Duration,

    /// The number of attempts made to complete this request.
    ///
    /// Higher than `1` only when the API rate limited the call.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the response data to a different type using the provided function.
    ///
    /// # Examples
    ///
    /// ```
    /// # use openrobot_api::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     "42".to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Like [`Response::map`] for fallible conversions.
    pub fn try_map<U, F>(self, f: F) -> Result<Response<U>>
    where
        F: FnOnce(T) -> Result<U>,
    {
        Ok(Response {
            data: f(self.data)?,
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        })
    }

    /// Returns `true` if the request was rate limited and retried.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl Response<Body> {
    /// Deserializes the JSON body into `T`.
    ///
    /// Fails with [`Error::UnexpectedContentType`] when the body is text and
    /// with [`Error::DeserializationFailed`] when the JSON does not fit `T`.
    pub fn json<T: DeserializeOwned>(self) -> Result<Response<T>> {
        let status = self.status;
        let content_type = content_type(&self.headers).map(str::to_string);
        let headers = self.headers.clone();
        let raw = self.raw_body.clone();
        self.try_map(|body| match body {
            Body::Json(value) => serde_json::from_value(value).map_err(|e| {
                tracing::error!(
                    error = %e,
                    raw_response = %raw,
                    "Failed to deserialize response"
                );
                Error::DeserializationFailed {
                    raw_response: raw.clone(),
                    serde_error: e.to_string(),
                    status,
                }
            }),
            Body::Text(text) => Err(Error::UnexpectedContentType {
                content_type,
                body: text.clone(),
                response: Box::new(crate::error::ErrorResponse {
                    status,
                    headers,
                    body: Body::Text(text),
                }),
            }),
        })
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde::Deserialize;
    use serde_json::json;

    fn json_headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_decode_json() {
        let body = decode_body(&json_headers("application/json"), br#"{"a": [1, 2]}"#);
        assert_eq!(body, Body::Json(json!({"a": [1, 2]})));
    }

    #[test]
    fn test_decode_json_with_charset() {
        let body = decode_body(
            &json_headers("Application/JSON; charset=utf-8"),
            br#"{"ok": true}"#,
        );
        assert_eq!(body, Body::Json(json!({"ok": true})));
    }

    #[test]
    fn test_decode_json_with_bom_falls_back_to_text_parse() {
        let bytes = "\u{feff}  {\"ok\": true}\n".as_bytes();
        let body = decode_body(&json_headers("application/json"), bytes);
        assert_eq!(body, Body::Json(json!({"ok": true})));
    }

    #[test]
    fn test_decode_without_content_type_keeps_text() {
        let body = decode_body(&HeaderMap::new(), b"just some text");
        assert_eq!(body, Body::Text("just some text".to_string()));
    }

    #[test]
    fn test_decode_json_body_with_text_content_type_keeps_text() {
        let body = decode_body(&json_headers("text/plain"), br#"{"a": 1}"#);
        assert_eq!(body, Body::Text(r#"{"a": 1}"#.to_string()));
    }

    #[test]
    fn test_decode_invalid_json_keeps_text() {
        let body = decode_body(&json_headers("application/json"), b"<html>502</html>");
        assert_eq!(body, Body::Text("<html>502</html>".to_string()));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ocr {
        text: String,
    }

    fn body_response(body: Body) -> Response<Body> {
        Response::new(
            body,
            String::new(),
            StatusCode::OK,
            HeaderMap::new(),
            Duration::from_millis(5),
            1,
        )
    }

    #[test]
    fn test_json_maps_into_typed_result() {
        let response = body_response(Body::Json(json!({"text": "hello"})));
        let typed = response.json::<Ocr>().unwrap();
        assert_eq!(typed.data, Ocr { text: "hello".to_string() });
        assert_eq!(typed.text, "hello");
        assert!(!typed.was_retried());
    }

    #[test]
    fn test_json_shape_mismatch() {
        let response = body_response(Body::Json(json!({"other": 1})));
        match response.json::<Ocr>() {
            Err(Error::DeserializationFailed { status, .. }) => assert_eq!(status, StatusCode::OK),
            other => panic!("Expected DeserializationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_json_on_text_body() {
        let response = body_response(Body::Text("oops".to_string()));
        match response.json::<Ocr>() {
            Err(Error::UnexpectedContentType { body, content_type, .. }) => {
                assert_eq!(body, "oops");
                assert_eq!(content_type, None);
            }
            other => panic!("Expected UnexpectedContentType, got {:?}", other),
        }
    }
}
