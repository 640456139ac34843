//! Request construction for each remote operation.
//!
//! Both clients build their requests here and only differ in how they send
//! them. Input validation happens while building, so a bad call never reaches
//! the network.

use crate::request::Request;
use crate::response::{Body, Response};
use crate::{Error, Result};
use http::Method;
use url::form_urlencoded;

/// File name reported for uploaded media.
const UPLOAD_FILE_NAME: &str = "upload";

/// Media passed to image and speech endpoints: a URL or the file itself.
///
/// Exactly one of the two must be set.
///
/// # Examples
///
/// ```
/// use openrobot_api::MediaInput;
///
/// let by_url = MediaInput::url("https://example.com/cat.png");
/// let by_bytes = MediaInput::file(std::fs::read("Cargo.toml").unwrap_or_default());
/// # let _ = (by_url, by_bytes);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInput {
    /// A publicly reachable URL of the media.
    pub url: Option<String>,
    /// The raw media bytes.
    pub file: Option<Vec<u8>>,
}

impl MediaInput {
    /// Media referenced by URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            file: None,
        }
    }

    /// Media uploaded as bytes.
    pub fn file(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            url: None,
            file: Some(bytes.into()),
        }
    }
}

enum Media {
    Url(String),
    File(Vec<u8>),
}

impl MediaInput {
    fn resolve(self) -> Result<Media> {
        let url = self.url.filter(|u| !u.is_empty());
        let file = self.file.filter(|f| !f.is_empty());
        match (url, file) {
            (Some(url), None) => Ok(Media::Url(url)),
            (None, Some(bytes)) => Ok(Media::File(bytes)),
            (None, None) => Err(Error::ConfigurationError(
                "either a url or a file must be given".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::ConfigurationError(
                "url and file cannot both be given".to_string(),
            )),
        }
    }
}

/// Speech synthesis engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TtsEngine {
    /// The regular voices.
    #[default]
    Standard,
    /// Neural voices, for the voices that support them.
    Neural,
}

impl TtsEngine {
    /// The value sent in the `engine` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            TtsEngine::Standard => "standard",
            TtsEngine::Neural => "neural",
        }
    }
}

/// URL input goes in the `url` query parameter using `url_method`; file input
/// is always a multipart POST.
fn media_request(path: &str, url_method: Method, input: MediaInput) -> Result<Request> {
    Ok(match input.resolve()? {
        Media::Url(url) => Request::new(url_method, path).with_query_param("url", url),
        Media::File(bytes) => Request::new(Method::POST, path).with_file(UPLOAD_FILE_NAME, bytes),
    })
}

fn path_segment(name: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::ConfigurationError(format!("{} cannot be empty", name)));
    }
    Ok(form_urlencoded::byte_serialize(value.as_bytes()).collect())
}

pub(crate) fn celebrity(input: MediaInput) -> Result<Request> {
    media_request("/api/celebrity", Method::GET, input)
}

pub(crate) fn ocr(input: MediaInput) -> Result<Request> {
    media_request("/api/ocr", Method::POST, input)
}

pub(crate) fn nsfw_check(input: MediaInput) -> Result<Request> {
    media_request("/api/nsfw-check", Method::GET, input)
}

pub(crate) fn description(input: MediaInput) -> Result<Request> {
    media_request("/api/description", Method::GET, input)
}

pub(crate) fn translate(text: &str, to_lang: &str, from_lang: Option<&str>) -> Request {
    Request::new(Method::GET, "/api/translate")
        .with_query_param("text", text)
        .with_query_param("to_lang", to_lang)
        .with_query_param("from_lang", from_lang.unwrap_or("auto"))
}

pub(crate) fn translate_languages() -> Request {
    Request::new(Method::GET, "/api/translate/languages")
}

pub(crate) fn speech_to_text(input: MediaInput, language_code: &str) -> Result<Request> {
    Ok(media_request("/api/speech/speech-to-text", Method::POST, input)?
        .with_query_param("language_code", language_code))
}

pub(crate) fn speech_to_text_support() -> Request {
    Request::new(Method::GET, "/api/speech/speech-to-text/supports")
}

pub(crate) fn text_to_speech(
    text: &str,
    language_code: &str,
    voice_id: &str,
    engine: TtsEngine,
) -> Request {
    Request::new(Method::GET, "/api/speech/text-to-speech")
        .with_query_param("text", text)
        .with_query_param("language_code", language_code)
        .with_query_param("voice_id", voice_id)
        .with_query_param("engine", engine.as_str())
}

pub(crate) fn text_to_speech_support() -> Request {
    Request::new(Method::GET, "/api/speech/text-to-speech/supports")
}

pub(crate) fn lyrics(query: &str) -> Result<Request> {
    Ok(Request::new(
        Method::GET,
        format!("/api/lyrics/{}", path_segment("query", query)?),
    ))
}

pub(crate) fn text_generation(text: &str, max_length: u32, num_return: u32) -> Request {
    Request::new(Method::POST, "/api/text-generation")
        .with_query_param("text", text)
        .with_query_param("max_length", max_length.to_string())
        .with_query_param("num_return", num_return.to_string())
}

pub(crate) fn text_generation_result(task_id: &str) -> Result<Request> {
    task("/api/text-generation", task_id)
}

pub(crate) fn sentiment(text: &str) -> Request {
    Request::new(Method::POST, "/api/sentiment").with_query_param("text", text)
}

pub(crate) fn sentiment_result(task_id: &str) -> Result<Request> {
    task("/api/sentiment", task_id)
}

pub(crate) fn summarization(text: &str, max_length: u32, min_length: u32) -> Request {
    Request::new(Method::POST, "/api/summarization")
        .with_query_param("text", text)
        .with_query_param("max_length", max_length.to_string())
        .with_query_param("min_length", min_length.to_string())
}

pub(crate) fn summarization_result(task_id: &str) -> Result<Request> {
    task("/api/summarization", task_id)
}

fn task(base: &str, task_id: &str) -> Result<Request> {
    Ok(Request::new(
        Method::GET,
        format!("{}/{}", base, path_segment("task_id", task_id)?),
    ))
}

/// `/api/translate` answers with a one-element list.
pub(crate) fn first<T>(response: Response<Body>) -> Result<Response<T>>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status;
    let raw_body = response.raw_body.clone();
    response.json::<Vec<T>>()?.try_map(|items| {
        items
            .into_iter()
            .next()
            .ok_or_else(|| Error::DeserializationFailed {
                raw_response: raw_body,
                serde_error: "expected a non-empty list".to_string(),
                status,
            })
    })
}
