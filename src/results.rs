//! Typed results returned by the endpoint methods.
//!
//! These mirror the JSON the API sends, field for field, except where the wire
//! shape is awkward to use directly (PascalCase voice records, single-element
//! result lists), in which case the conversion happens during deserialization.

use serde::{Deserialize, Deserializer};

/// Bounding box of a detected face, in pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaceRectangle {
    /// X-coordinate of the top left point of the face.
    pub left: f64,
    /// Y-coordinate of the top left point of the face.
    pub top: f64,
    /// Width measured from the top left point.
    pub width: f64,
    /// Height measured from the top left point.
    pub height: f64,
}

/// A celebrity recognized in an image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CelebrityResult {
    /// The name of the celebrity.
    pub name: String,
    /// Recognition confidence.
    pub confidence: f64,
    /// Where the face is in the image.
    pub face_rectangle: FaceRectangle,
}

/// Adult content verdict.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NsfwAdult {
    /// Whether the image is adult content.
    pub is_adult: bool,
    /// Score from 0 to 1.
    pub adult_score: f64,
}

/// Racy content verdict.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NsfwRacy {
    /// Whether the image is racy.
    pub is_racy: bool,
    /// Score from 0 to 1.
    pub racy_score: f64,
}

/// Gore content verdict.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NsfwGore {
    /// Whether the image contains gore.
    pub is_gore: bool,
    /// Score from 0 to 1.
    pub gore_score: f64,
}

/// Result of `/api/nsfw-check`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NsfwCheckResult {
    /// The image that was checked.
    pub image_url: String,
    /// Adult content verdict.
    pub adult: NsfwAdult,
    /// Racy content verdict.
    pub racy: NsfwRacy,
    /// Gore content verdict.
    pub gore: NsfwGore,
}

/// Result of `/api/ocr`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OcrResult {
    /// The recognized text.
    pub text: String,
}

/// Result of `/api/translate`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranslateResult {
    /// The language translated to.
    pub to: String,
    /// The translated text.
    pub text: String,
    /// The detected or given language of the original text.
    pub source: String,
    /// The original text.
    pub before: String,
}

/// Result of `/api/speech/speech-to-text`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeechToTextResult {
    /// The recognized text.
    pub text: String,
    /// Seconds spent recognizing the speech.
    pub duration: f64,
}

/// Result of `/api/speech/text-to-speech`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextToSpeechResult {
    /// Where the generated audio can be downloaded.
    pub url: String,
}

/// A language a text-to-speech voice speaks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TtsLanguage {
    /// The language code, e.g. `en-US`.
    pub code: Option<String>,
    /// The human readable language name.
    pub name: Option<String>,
}

/// A voice available for text to speech.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "WireVoice")]
pub struct TtsVoice {
    /// `Male` or `Female`.
    pub gender: Option<String>,
    /// The voice ID to pass to `text_to_speech`.
    pub id: Option<String>,
    /// The language the voice speaks.
    pub language: TtsLanguage,
    /// The display name of the voice.
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireVoice {
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    language_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl From<WireVoice> for TtsVoice {
    fn from(wire: WireVoice) -> Self {
        Self {
            gender: wire.gender,
            id: wire.id,
            language: TtsLanguage {
                code: wire.language_code,
                name: wire.language_name,
            },
            name: wire.name,
        }
    }
}

/// Result of `/api/speech/text-to-speech/supports`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextToSpeechSupportResult {
    /// Supported language codes.
    pub languages: Vec<String>,
    /// Available voices.
    pub voices: Vec<TtsVoice>,
}

/// Artwork for a track.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LyricImages {
    /// Background image URL.
    #[serde(default)]
    pub background: Option<String>,
    /// Cover art URL.
    #[serde(default)]
    pub track: Option<String>,
}

/// Result of `/api/lyrics/{query}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LyricResult {
    /// The song title.
    #[serde(default)]
    pub title: Option<String>,
    /// The performing artist.
    #[serde(default)]
    pub artist: Option<String>,
    /// The full lyrics.
    #[serde(default)]
    pub lyrics: Option<String>,
    /// Artwork, empty when the API sends none.
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: LyricImages,
}

/// Progress of a queued text task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Accepted by the API.
    Started,
    /// Waiting for a worker.
    Pending,
    /// Finished with a result.
    Completed,
    /// Finished without a result.
    Failed,
    /// A status this version of the crate does not know about.
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Whether the task has stopped, successfully or not.
    pub fn is_finished(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Result of `/api/text-generation`.
///
/// Generation runs in the background: poll
/// `text_generation_result(task_id)` until [`TaskStatus::is_finished`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextGenerationResult {
    /// The ID to poll with `text_generation_result`.
    pub task_id: String,
    /// The prompt.
    pub text: String,
    /// Maximum length of each generated text.
    pub max_length: u32,
    /// How many texts were requested.
    pub num_return: u32,
    /// Progress of the task.
    pub status: TaskStatus,
    /// The generated texts, once completed.
    #[serde(default, deserialize_with = "generated_texts")]
    pub result: Option<Vec<String>>,
    /// When the task was created, as a Unix timestamp.
    pub timestamp: f64,
}

/// One sentiment label with its score.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SentimentScore {
    /// `POSITIVE` or `NEGATIVE`.
    pub label: String,
    /// Confidence from 0 to 1.
    pub score: f64,
}

/// Result of `/api/sentiment`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SentimentResult {
    /// The ID to poll with `sentiment_result`.
    pub task_id: String,
    /// The analyzed text.
    pub text: String,
    /// Progress of the task.
    pub status: TaskStatus,
    /// Empty until the task completes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: Vec<SentimentScore>,
    /// When the task was created, as a Unix timestamp.
    pub timestamp: f64,
}

/// Result of `/api/summarization`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummarizationResult {
    /// The ID to poll with `summarization_result`.
    pub task_id: String,
    /// The text being summarized.
    pub text: String,
    /// Maximum length of the summary.
    pub max_length: u32,
    /// Minimum length of the summary.
    pub min_length: u32,
    /// Progress of the task.
    pub status: TaskStatus,
    /// The summary, once completed.
    #[serde(default, deserialize_with = "summary_text")]
    pub result: Option<String>,
    /// When the task was created, as a Unix timestamp.
    pub timestamp: f64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn generated_texts<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Generated {
        generated_text: String,
    }

    let items = Option::<Vec<Generated>>::deserialize(deserializer)?;
    Ok(items
        .filter(|items| !items.is_empty())
        .map(|items| items.into_iter().map(|g| g.generated_text).collect()))
}

fn summary_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Summary {
        summary_text: String,
    }

    let items = Option::<Vec<Summary>>::deserialize(deserializer)?;
    Ok(items.and_then(|items| items.into_iter().next().map(|s| s.summary_text)))
}
