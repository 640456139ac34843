//! Error types for OpenRobot API calls.
//!
//! Every failure the request pipeline can produce is a variant of [`Error`].
//! Status-mapped variants carry an [`ErrorResponse`] snapshot of the HTTP
//! response (status, headers and decoded body) so callers can inspect exactly
//! what the API sent back, independent of which client style made the call.

use crate::response::Body;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// Snapshot of the HTTP response that caused an error.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The decoded response body.
    pub body: Body,
}

/// The main error type for OpenRobot API calls.
///
/// # Examples
///
/// ```no_run
/// use openrobot_api::{Client, Error, MediaInput};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().token("my-token").build()?;
///
/// match client.ocr(MediaInput::url("https://example.com/receipt.png")).await {
///     Ok(result) => println!("{}", result.text),
///     Err(Error::Forbidden { message, error_code, .. }) => {
///         eprintln!("forbidden ({:?}): {}", error_code, message);
///     }
///     Err(Error::TooManyRequests { retry_after, .. }) => {
///         eprintln!("rate limited, retry after {:?}", retry_after);
///     }
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No token was supplied and none could be resolved from the credentials
    /// file or the environment.
    #[error("No token was provided")]
    NoTokenProvided,

    /// The API answered with 403.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// The `message` field of the error body.
        message: String,
        /// The `error.code` field of the error body.
        error_code: Option<i64>,
        /// The response that carried the error.
        response: Box<ErrorResponse>,
    },

    /// The API answered with 400.
    #[error("Bad request: {message}")]
    BadRequest {
        /// The `message` field of the error body.
        message: String,
        /// The `error.code` field of the error body.
        error_code: Option<i64>,
        /// The response that carried the error.
        response: Box<ErrorResponse>,
    },

    /// The API answered with 500.
    #[error("Internal server error: {message}")]
    InternalServerError {
        /// The `message` field of the error body.
        message: String,
        /// The `error.code` field of the error body.
        error_code: Option<i64>,
        /// The response that carried the error.
        response: Box<ErrorResponse>,
    },

    /// The API answered with 429 and the request was not (or no longer) retried.
    ///
    /// This is returned immediately when rate-limit handling is disabled, and
    /// after the try budget is spent when it is enabled.
    #[error("Too many requests: {message}")]
    TooManyRequests {
        /// The `message` field of the error body, or the status reason.
        message: String,
        /// The `error.code` field of the error body.
        error_code: Option<i64>,
        /// The parsed `Retry-After` header, if present.
        retry_after: Option<Duration>,
        /// The response that carried the error.
        response: Box<ErrorResponse>,
    },

    /// A JSON body was expected but the response decoded as text.
    ///
    /// Usually means something between the client and the API (an edge proxy,
    /// a captive portal) answered instead of the API itself.
    #[error("Unexpected content type {content_type:?} (status {})", .response.status)]
    UnexpectedContentType {
        /// The `content-type` header value, if any.
        content_type: Option<String>,
        /// The decoded text body.
        body: String,
        /// The response that carried the body.
        response: Box<ErrorResponse>,
    },

    /// Any other non-success status.
    #[error("API error {status}: {message}")]
    Api {
        /// The HTTP status code.
        status: StatusCode,
        /// The `message` field of the body, or the raw text.
        message: String,
        /// The response that carried the error.
        response: Box<ErrorResponse>,
    },

    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The response body could not be mapped into the typed result.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid configuration or input was provided.
    ///
    /// Covers programmer errors that are never retried: a target URL outside
    /// the allowed hosts, both or neither of a pair of mutually exclusive
    /// inputs, a 429 without `Retry-After`, invalid header values.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Maps a transport error, splitting out timeouts.
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err)
        }
    }

    /// Returns `true` if this error is potentially retryable.
    ///
    /// Only rate limiting is considered transient; every status-mapped error
    /// and every configuration error is final.
    ///
    /// # Examples
    ///
    /// ```
    /// use openrobot_api::Error;
    ///
    /// assert!(!Error::NoTokenProvided.is_retryable());
    /// assert!(!Error::ConfigurationError("invalid URL".into()).is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TooManyRequests { .. })
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => self.response().map(|r| r.status),
        }
    }

    /// Returns the response snapshot if this error was caused by one.
    pub fn response(&self) -> Option<&ErrorResponse> {
        match self {
            Error::Forbidden { response, .. }
            | Error::BadRequest { response, .. }
            | Error::InternalServerError { response, .. }
            | Error::TooManyRequests { response, .. }
            | Error::UnexpectedContentType { response, .. }
            | Error::Api { response, .. } => Some(&**response),
            _ => None,
        }
    }

    /// Returns the API-supplied message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Error::Forbidden { message, .. }
            | Error::BadRequest { message, .. }
            | Error::InternalServerError { message, .. }
            | Error::TooManyRequests { message, .. }
            | Error::Api { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Returns the API-supplied machine error code, if any.
    pub fn error_code(&self) -> Option<i64> {
        match self {
            Error::Forbidden { error_code, .. }
            | Error::BadRequest { error_code, .. }
            | Error::InternalServerError { error_code, .. }
            | Error::TooManyRequests { error_code, .. } => *error_code,
            _ => None,
        }
    }

    /// Returns how long the server asked us to wait, for rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::TooManyRequests { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// A specialized `Result` type for OpenRobot API calls.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
