//! Request descriptors.

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::Value;

/// Multipart field name used for uploaded files.
pub const FILE_FIELD: &str = "file";

/// The body of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// A JSON document.
    Json(Value),
    /// A single file sent as a multipart form field.
    File {
        /// The form field name.
        field: String,
        /// The file name reported to the server.
        file_name: String,
        /// The file contents.
        bytes: Vec<u8>,
    },
}

/// Everything needed to make one call through the request pipeline.
///
/// # Examples
///
/// ```
/// use openrobot_api::Request;
/// use http::{Method, StatusCode};
///
/// let request = Request::new(Method::GET, "/api/translate")
///     .with_query_param("text", "hello")
///     .with_query_param("to_lang", "es")
///     .accept_status(StatusCode::NOT_FOUND);
/// assert_eq!(request.query_params.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path (relative to the base URL) or an absolute URL.
    pub path: String,

    /// Additional headers for this request.
    pub headers: HeaderMap,

    /// Query parameters, in order.
    pub query_params: Vec<(String, String)>,

    /// Optional request body.
    pub body: Option<RequestBody>,

    /// Statuses returned as success without any error mapping.
    pub accept_statuses: Vec<StatusCode>,

    /// Whether a JSON body is required. Defaults to `true`.
    pub expect_json: bool,
}

impl Request {
    /// Creates a new `Request` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            body: None,
            accept_statuses: Vec::new(),
            expect_json: true,
        }
    }

    /// Adds a header to the request.
    ///
    /// A header set here wins over client defaults, including `Authorization`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Sets a JSON body.
    pub fn with_json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Sets a multipart file body under the `file` field.
    pub fn with_file(mut self, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.body = Some(RequestBody::File {
            field: FILE_FIELD.to_string(),
            file_name: file_name.into(),
            bytes,
        });
        self
    }

    /// Treats `status` as success, bypassing error mapping.
    pub fn accept_status(mut self, status: StatusCode) -> Self {
        self.accept_statuses.push(status);
        self
    }

    /// Allows a text body instead of failing with `UnexpectedContentType`.
    pub fn allow_text(mut self) -> Self {
        self.expect_json = false;
        self
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}
