//! Async client and the builder shared by both client styles.
//!
//! The [`Client`] type is the main entry point for async code. Use
//! [`ClientBuilder`] to configure it, or to build a
//! [`BlockingClient`](crate::BlockingClient) with the same settings.

use crate::{
    blocking::BlockingClient,
    credentials, endpoints,
    endpoints::{MediaInput, TtsEngine},
    pipeline::{Pipeline, Prepared, Step},
    rate_limit::RateLimitConfig,
    request::{Request, RequestBody},
    response::{Body, RawResponse},
    results::{
        CelebrityResult, LyricResult, NsfwCheckResult, OcrResult, SentimentResult,
        SpeechToTextResult, SummarizationResult, TextGenerationResult, TextToSpeechResult,
        TextToSpeechSupportResult, TranslateResult,
    },
    retry::{RetryBudget, Tries},
    Error, Response, Result, DEFAULT_ALLOWED_HOSTS, DEFAULT_BASE_URL, TEST_TOKEN,
};
use http::{HeaderMap, HeaderName, HeaderValue};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// An async client for the OpenRobot API.
///
/// Several calls may be in flight at once; a call that is rate limited waits
/// with `tokio::time::sleep`, so it never blocks the runtime.
///
/// # Examples
///
/// ```no_run
/// use openrobot_api::{Client, MediaInput, Tries};
/// use openrobot_api::rate_limit::RateLimitConfig;
///
/// # async fn example() -> Result<(), openrobot_api::Error> {
/// let client = Client::builder()
///     .token("my-token")
///     .rate_limit_config(RateLimitConfig::builder().tries(Tries::Limited(3)).build())
///     .build()?;
///
/// let ocr = client.ocr(MediaInput::url("https://example.com/receipt.png")).await?;
/// println!("{}", ocr.text);
///
/// let translated = client.translate("hello", "es", None).await?;
/// println!("{}", translated.text);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    pipeline: Pipeline,
    session: Option<reqwest::Client>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Sends a request through the pipeline.
    ///
    /// Rate-limited attempts are retried after `Retry-After` within the try
    /// budget; every other non-success status fails right away.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use openrobot_api::{Body, Client, Request};
    /// use http::Method;
    ///
    /// # async fn example() -> Result<(), openrobot_api::Error> {
    /// let client = Client::builder().token("my-token").build()?;
    ///
    /// let request = Request::new(Method::GET, "/api/translate/languages");
    /// let response = client.send(request).await?;
    /// if let Body::Json(languages) = &response.data {
    ///     println!("{}", languages);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send(&self, request: Request) -> Result<Response<Body>> {
        let pipeline = &self.inner.pipeline;
        let prepared = pipeline.prepare(&request)?;
        let session = match &self.inner.session {
            Some(session) => session.clone(),
            None => reqwest::Client::builder().build().map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?,
        };

        let started = Instant::now();
        let mut budget = RetryBudget::new(pipeline.rate_limit.tries);

        loop {
            let attempt = budget.begin_attempt();
            let raw = self
                .execute_request(&session, &prepared, &request, attempt)
                .await?;

            match pipeline.interpret(&request, raw, &budget, started)? {
                Step::Done(response) => return Ok(response),
                Step::Wait(delay) => tokio::time::sleep(delay).await,
            }
        }
    }

    /// Executes a single request attempt.
    async fn execute_request(
        &self,
        session: &reqwest::Client,
        prepared: &Prepared,
        request: &Request,
        attempt: usize,
    ) -> Result<RawResponse> {
        tracing::debug!(
            method = %prepared.method,
            url = %prepared.url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut builder = session
            .request(prepared.method.clone(), prepared.url.clone())
            .headers(prepared.headers.clone());

        if let Some(timeout) = self.inner.pipeline.timeout {
            builder = builder.timeout(timeout);
        }

        match &request.body {
            Some(RequestBody::Json(value)) => builder = builder.json(value),
            Some(RequestBody::File {
                field,
                file_name,
                bytes,
            }) => {
                let part = reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                builder = builder.multipart(reqwest::multipart::Form::new().part(field.clone(), part));
            }
            None => {}
        }

        let response = builder.send().await.map_err(Error::transport)?;
        RawResponse::from_async(response).await
    }

    /// Recognizes celebrities in an image.
    pub async fn celebrity(&self, input: MediaInput) -> Result<Response<Vec<CelebrityResult>>> {
        self.send(endpoints::celebrity(input)?).await?.json()
    }

    /// Extracts text from an image.
    pub async fn ocr(&self, input: MediaInput) -> Result<Response<OcrResult>> {
        self.send(endpoints::ocr(input)?).await?.json()
    }

    /// Checks an image for adult, racy and gore content.
    pub async fn nsfw_check(&self, input: MediaInput) -> Result<Response<NsfwCheckResult>> {
        self.send(endpoints::nsfw_check(input)?).await?.json()
    }

    /// Describes the contents of an image.
    pub async fn description(&self, input: MediaInput) -> Result<Response<serde_json::Value>> {
        self.send(endpoints::description(input)?).await?.json()
    }

    /// Translates `text` into `to_lang`. `from_lang` defaults to `auto`.
    pub async fn translate(
        &self,
        text: &str,
        to_lang: &str,
        from_lang: Option<&str>,
    ) -> Result<Response<TranslateResult>> {
        endpoints::first(self.send(endpoints::translate(text, to_lang, from_lang)).await?)
    }

    /// Languages supported by `translate`, as `{name: code}`.
    pub async fn translate_languages(&self) -> Result<Response<HashMap<String, String>>> {
        self.send(endpoints::translate_languages()).await?.json()
    }

    /// Transcribes speech in the given language.
    pub async fn speech_to_text(
        &self,
        input: MediaInput,
        language_code: &str,
    ) -> Result<Response<SpeechToTextResult>> {
        self.send(endpoints::speech_to_text(input, language_code)?)
            .await?
            .json()
    }

    /// What `speech_to_text` supports.
    pub async fn speech_to_text_support(&self) -> Result<Response<serde_json::Value>> {
        self.send(endpoints::speech_to_text_support()).await?.json()
    }

    /// Synthesizes speech and returns where to download it.
    pub async fn text_to_speech(
        &self,
        text: &str,
        language_code: &str,
        voice_id: &str,
        engine: TtsEngine,
    ) -> Result<Response<TextToSpeechResult>> {
        self.send(endpoints::text_to_speech(text, language_code, voice_id, engine))
            .await?
            .json()
    }

    /// Languages and voices supported by `text_to_speech`.
    pub async fn text_to_speech_support(&self) -> Result<Response<TextToSpeechSupportResult>> {
        self.send(endpoints::text_to_speech_support()).await?.json()
    }

    /// Looks up song lyrics.
    pub async fn lyrics(&self, query: &str) -> Result<Response<LyricResult>> {
        self.send(endpoints::lyrics(query)?).await?.json()
    }

    /// Queues a text generation task.
    pub async fn text_generation(
        &self,
        text: &str,
        max_length: u32,
        num_return: u32,
    ) -> Result<Response<TextGenerationResult>> {
        self.send(endpoints::text_generation(text, max_length, num_return))
            .await?
            .json()
    }

    /// Fetches a text generation task by ID.
    pub async fn text_generation_result(
        &self,
        task_id: &str,
    ) -> Result<Response<TextGenerationResult>> {
        self.send(endpoints::text_generation_result(task_id)?)
            .await?
            .json()
    }

    /// Queues a sentiment analysis task.
    pub async fn sentiment(&self, text: &str) -> Result<Response<SentimentResult>> {
        self.send(endpoints::sentiment(text)).await?.json()
    }

    /// Fetches a sentiment task by ID.
    pub async fn sentiment_result(&self, task_id: &str) -> Result<Response<SentimentResult>> {
        self.send(endpoints::sentiment_result(task_id)?).await?.json()
    }

    /// Queues a summarization task.
    pub async fn summarization(
        &self,
        text: &str,
        max_length: u32,
        min_length: u32,
    ) -> Result<Response<SummarizationResult>> {
        self.send(endpoints::summarization(text, max_length, min_length))
            .await?
            .json()
    }

    /// Fetches a summarization task by ID.
    pub async fn summarization_result(
        &self,
        task_id: &str,
    ) -> Result<Response<SummarizationResult>> {
        self.send(endpoints::summarization_result(task_id)?)
            .await?
            .json()
    }
}

/// Builder for configuring and creating a [`Client`] or [`BlockingClient`].
///
/// When no token is given, it is resolved from the credentials file or the
/// `OPENROBOT_API_TOKEN` environment variable (see [`crate::credentials`]).
///
/// # Examples
///
/// ```no_run
/// use openrobot_api::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), openrobot_api::Error> {
/// let client = ClientBuilder::new()
///     .token("my-token")
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .build_blocking()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    token: Option<String>,
    ignore_warning: bool,
    base_url: Option<Url>,
    allowed_hosts: Option<Regex>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    rate_limit_config: RateLimitConfig,
    session: Option<reqwest::Client>,
    blocking_session: Option<reqwest::blocking::Client>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            token: None,
            ignore_warning: false,
            base_url: None,
            allowed_hosts: None,
            default_headers: HeaderMap::new(),
            timeout: None,
            rate_limit_config: RateLimitConfig::default(),
            session: None,
            blocking_session: None,
        }
    }

    /// Sets the API token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Silences the warning logged for the shared test token.
    pub fn ignore_warning(mut self, ignore: bool) -> Self {
        self.ignore_warning = ignore;
        self
    }

    /// Sets the base URL that relative paths resolve against.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(url.as_ref())?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = Some(url);
        Ok(self)
    }

    /// Sets the pattern every target URL must match.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn allowed_hosts(mut self, pattern: impl AsRef<str>) -> Result<Self> {
        let regex = Regex::new(pattern.as_ref()).map_err(|e| {
            Error::ConfigurationError(format!("Invalid allowed hosts pattern: {}", e))
        })?;
        self.allowed_hosts = Some(regex);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the rate limit configuration.
    ///
    /// By default rate limits are honored with up to five attempts per call.
    pub fn rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// Reuses an existing async HTTP client instead of one per call.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.session = Some(client);
        self
    }

    /// Reuses an existing blocking HTTP client instead of one per call.
    pub fn blocking_http_client(mut self, client: reqwest::blocking::Client) -> Self {
        self.blocking_session = Some(client);
        self
    }

    /// Builds the async [`Client`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoTokenProvided`] if no token is available, or a
    /// configuration error for an invalid token or try budget.
    pub fn build(mut self) -> Result<Client> {
        let session = self.session.take();
        Ok(Client {
            inner: Arc::new(ClientInner {
                pipeline: self.into_pipeline()?,
                session,
            }),
        })
    }

    /// Builds a [`BlockingClient`] with the same settings.
    ///
    /// # Errors
    ///
    /// Same as [`ClientBuilder::build`].
    pub fn build_blocking(mut self) -> Result<BlockingClient> {
        let session = self.blocking_session.take();
        Ok(BlockingClient::new(self.into_pipeline()?, session))
    }

    fn into_pipeline(self) -> Result<Pipeline> {
        let token = match self.token {
            Some(token) => Some(token),
            None => credentials::resolve_token(),
        };
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or(Error::NoTokenProvided)?;

        if token == TEST_TOKEN && !self.ignore_warning {
            tracing::warn!(
                "Using the {} token only allows 5 requests per day (reset at 00:00 UTC); \
                 further /api calls fail with Forbidden",
                TEST_TOKEN
            );
        }

        let mut token = HeaderValue::from_str(&token)
            .map_err(|e| Error::ConfigurationError(format!("Invalid token: {}", e)))?;
        token.set_sensitive(true);

        if self.rate_limit_config.tries == Tries::Limited(0) {
            return Err(Error::ConfigurationError(
                "tries must be at least 1".to_string(),
            ));
        }

        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        let allowed_hosts = match self.allowed_hosts {
            Some(regex) => regex,
            None => Regex::new(DEFAULT_ALLOWED_HOSTS).map_err(|e| {
                Error::ConfigurationError(format!("Invalid allowed hosts pattern: {}", e))
            })?,
        };

        Ok(Pipeline {
            token,
            base_url,
            allowed_hosts,
            default_headers: self.default_headers,
            timeout: self.timeout,
            rate_limit: self.rate_limit_config,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
