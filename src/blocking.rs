//! A blocking client for the OpenRobot API.
//!
//! Same settings, endpoints and error mapping as [`crate::Client`]. Rate-limit
//! waits put the calling thread to sleep. Do not use it from inside an async
//! runtime.

use crate::{
    endpoints,
    endpoints::{MediaInput, TtsEngine},
    pipeline::{Pipeline, Prepared, Step},
    request::{Request, RequestBody},
    response::{Body, RawResponse},
    results::{
        CelebrityResult, LyricResult, NsfwCheckResult, OcrResult, SentimentResult,
        SpeechToTextResult, SummarizationResult, TextGenerationResult, TextToSpeechResult,
        TextToSpeechSupportResult, TranslateResult,
    },
    retry::RetryBudget,
    ClientBuilder, Error, Response, Result,
};
use reqwest::blocking::multipart::{Form, Part};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// A blocking client for the OpenRobot API.
///
/// # Examples
///
/// ```no_run
/// use openrobot_api::{BlockingClient, MediaInput};
///
/// # fn example() -> Result<(), openrobot_api::Error> {
/// let client = BlockingClient::builder().token("my-token").build_blocking()?;
///
/// let nsfw = client.nsfw_check(MediaInput::url("https://example.com/a.png"))?;
/// println!("{:?}", nsfw.adult);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BlockingClient {
    inner: Arc<BlockingInner>,
}

struct BlockingInner {
    pipeline: Pipeline,
    session: Option<reqwest::blocking::Client>,
}

impl BlockingClient {
    pub(crate) fn new(pipeline: Pipeline, session: Option<reqwest::blocking::Client>) -> Self {
        Self {
            inner: Arc::new(BlockingInner { pipeline, session }),
        }
    }

    /// Creates a new `ClientBuilder`; finish it with
    /// [`ClientBuilder::build_blocking`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Sends a request through the pipeline, sleeping between rate-limited
    /// attempts.
    pub fn send(&self, request: Request) -> Result<Response<Body>> {
        let pipeline = &self.inner.pipeline;
        let prepared = pipeline.prepare(&request)?;
        let session = match &self.inner.session {
            Some(session) => session.clone(),
            None => reqwest::blocking::Client::builder().build().map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?,
        };

        let started = Instant::now();
        let mut budget = RetryBudget::new(pipeline.rate_limit.tries);

        loop {
            let attempt = budget.begin_attempt();
            let raw = self.execute_request(&session, &prepared, &request, attempt)?;

            match pipeline.interpret(&request, raw, &budget, started)? {
                Step::Done(response) => return Ok(response),
                Step::Wait(delay) => std::thread::sleep(delay),
            }
        }
    }

    fn execute_request(
        &self,
        session: &reqwest::blocking::Client,
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
                let part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                builder = builder.multipart(Form::new().part(field.clone(), part));
            }
            None => {}
        }

        let response = builder.send().map_err(Error::transport)?;
        RawResponse::from_blocking(response)
    }

    /// Recognizes celebrities in an image.
    pub fn celebrity(&self, input: MediaInput) -> Result<Response<Vec<CelebrityResult>>> {
        self.send(endpoints::celebrity(input)?)?.json()
    }

    /// Extracts text from an image.
    pub fn ocr(&self, input: MediaInput) -> Result<Response<OcrResult>> {
        self.send(endpoints::ocr(input)?)?.json()
    }

    /// Checks an image for adult, racy and gore content.
    pub fn nsfw_check(&self, input: MediaInput) -> Result<Response<NsfwCheckResult>> {
        self.send(endpoints::nsfw_check(input)?)?.json()
    }

    /// Describes the contents of an image.
    pub fn description(&self, input: MediaInput) -> Result<Response<serde_json::Value>> {
        self.send(endpoints::description(input)?)?.json()
    }

    /// Translates `text` into `to_lang`. `from_lang` defaults to `auto`.
    pub fn translate(
        &self,
        text: &str,
        to_lang: &str,
        from_lang: Option<&str>,
    ) -> Result<Response<TranslateResult>> {
        endpoints::first(self.send(endpoints::translate(text, to_lang, from_lang))?)
    }

    /// Languages supported by `translate`, as `{name: code}`.
    pub fn translate_languages(&self) -> Result<Response<HashMap<String, String>>> {
        self.send(endpoints::translate_languages())?.json()
    }

    /// Transcribes speech in the given language.
    pub fn speech_to_text(
        &self,
        input: MediaInput,
        language_code: &str,
    ) -> Result<Response<SpeechToTextResult>> {
        self.send(endpoints::speech_to_text(input, language_code)?)?
            .json()
    }

    /// What `speech_to_text` supports.
    pub fn speech_to_text_support(&self) -> Result<Response<serde_json::Value>> {
        self.send(endpoints::speech_to_text_support())?.json()
    }

    /// Synthesizes speech and returns where to download it.
    pub fn text_to_speech(
        &self,
        text: &str,
        language_code: &str,
        voice_id: &str,
        engine: TtsEngine,
    ) -> Result<Response<TextToSpeechResult>> {
        self.send(endpoints::text_to_speech(text, language_code, voice_id, engine))?
            .json()
    }

    /// Languages and voices supported by `text_to_speech`.
    pub fn text_to_speech_support(&self) -> Result<Response<TextToSpeechSupportResult>> {
        self.send(endpoints::text_to_speech_support())?.json()
    }

    /// Looks up song lyrics.
    pub fn lyrics(&self, query: &str) -> Result<Response<LyricResult>> {
        self.send(endpoints::lyrics(query)?)?.json()
    }

    /// Queues a text generation task.
    pub fn text_generation(
        &self,
        text: &str,
        max_length: u32,
        num_return: u32,
    ) -> Result<Response<TextGenerationResult>> {
        self.send(endpoints::text_generation(text, max_length, num_return))?
            .json()
    }

    /// Fetches a text generation task by ID.
    pub fn text_generation_result(&self, task_id: &str) -> Result<Response<TextGenerationResult>> {
        self.send(endpoints::text_generation_result(task_id)?)?
            .json()
    }

    /// Queues a sentiment analysis task.
    pub fn sentiment(&self, text: &str) -> Result<Response<SentimentResult>> {
        self.send(endpoints::sentiment(text))?.json()
    }

    /// Fetches a sentiment task by ID.
    pub fn sentiment_result(&self, task_id: &str) -> Result<Response<SentimentResult>> {
        self.send(endpoints::sentiment_result(task_id)?)?.json()
    }

    /// Queues a summarization task.
    pub fn summarization(
        &self,
        text: &str,
        max_length: u32,
        min_length: u32,
    ) -> Result<Response<SummarizationResult>> {
        self.send(endpoints::summarization(text, max_length, min_length))?
            .json()
    }

    /// Fetches a summarization task by ID.
    pub fn summarization_result(&self, task_id: &str) -> Result<Response<SummarizationResult>> {
        self.send(endpoints::summarization_result(task_id)?)?
            .json()
    }
}
