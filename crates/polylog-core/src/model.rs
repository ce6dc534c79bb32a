//! Core data model types for polylog.
//!
//! These are the records the engine scores, persists, and aggregates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Languages a learner can practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ja", alias = "jp")]
    Japanese,
}

impl Language {
    /// BCP 47 locale used when synthesizing or recognizing speech.
    pub fn speech_locale(&self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Japanese => "ja-JP",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::English => write!(f, "en"),
            Language::Japanese => write!(f, "ja"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "ja" | "jp" | "japanese" => Ok(Language::Japanese),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// The test modalities a question batch can be taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestMode {
    MultipleChoice,
    SpeechAccuracy,
    AiReview,
    ListeningComprehension,
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestMode::MultipleChoice => write!(f, "multiple-choice"),
            TestMode::SpeechAccuracy => write!(f, "speech-accuracy"),
            TestMode::AiReview => write!(f, "ai-review"),
            TestMode::ListeningComprehension => write!(f, "listening-comprehension"),
        }
    }
}

impl FromStr for TestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multiple-choice" | "choice" => Ok(TestMode::MultipleChoice),
            "speech-accuracy" | "speech" => Ok(TestMode::SpeechAccuracy),
            "ai-review" | "review" => Ok(TestMode::AiReview),
            "listening-comprehension" | "listening" => Ok(TestMode::ListeningComprehension),
            other => Err(format!("unknown test mode: {other}")),
        }
    }
}

/// Which flavour of content document to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    Learn,
    Review,
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentMode::Learn => write!(f, "learn"),
            ContentMode::Review => write!(f, "review"),
        }
    }
}

impl FromStr for ContentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "learn" => Ok(ContentMode::Learn),
            "review" => Ok(ContentMode::Review),
            other => Err(format!("unknown content mode: {other}")),
        }
    }
}

/// Composite module identifier, e.g. `"300-301-vocab-easy"`.
///
/// Dashboard grouping only looks at the leading `-`-delimited segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleCode(String);

impl ModuleCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Join parts with `-`, skipping empty ones.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = parts
            .into_iter()
            .filter(|p| !p.as_ref().is_empty())
            .map(|p| p.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("-");
        Self(joined)
    }

    /// The leading segment used as the dashboard grouping key.
    pub fn category(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A single question presented to a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionItem {
    /// Identifier, unique within a day of content.
    pub id: String,
    /// Text shown (or read aloud) to the learner.
    pub prompt: String,
    /// Accepted answers; the first one is canonical.
    #[serde(default)]
    pub answers: Vec<String>,
    /// Options for choice-based items.
    #[serde(default)]
    pub options: Vec<String>,
    /// Index into `options` of the correct choice.
    #[serde(default)]
    pub correct_option: Option<usize>,
    /// Headword for vocabulary and listening items.
    #[serde(default)]
    pub word: Option<String>,
}

impl QuestionItem {
    /// Whether the item is answered by picking an option.
    pub fn is_choice(&self) -> bool {
        !self.options.is_empty() && self.correct_option.is_some()
    }

    /// The canonical answer text: the first accepted answer, or the correct
    /// option for choice items.
    pub fn canonical_answer(&self) -> Option<&str> {
        self.answers.first().map(String::as_str).or_else(|| {
            self.correct_option
                .and_then(|i| self.options.get(i))
                .map(String::as_str)
        })
    }

    /// Question text as stored in response records for a given modality.
    pub fn question_text(&self, mode: TestMode) -> String {
        match (mode, &self.word) {
            (TestMode::ListeningComprehension, Some(word)) => format!("{word}: {}", self.prompt),
            _ => self.prompt.clone(),
        }
    }

    /// Text handed to a speech synthesizer when the prompt is played.
    pub fn spoken_text(&self) -> &str {
        self.word.as_deref().unwrap_or(&self.prompt)
    }
}

/// One scored learner answer. Append-only once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub user_id: String,
    pub module_code: ModuleCode,
    pub language: Language,
    pub question_text: String,
    pub user_answer: String,
    /// Score in `[0, 100]`.
    pub score: f64,
    /// Raw evaluator feedback as JSON text, for AI-reviewed answers.
    #[serde(default)]
    pub feedback: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ResponseRecord {
    /// Build a record, rejecting scores outside `[0, 100]`.
    pub fn new(
        user_id: impl Into<String>,
        module_code: ModuleCode,
        language: Language,
        question_text: impl Into<String>,
        user_answer: impl Into<String>,
        score: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        validate_score(score)?;
        Ok(Self {
            user_id: user_id.into(),
            module_code,
            language,
            question_text: question_text.into(),
            user_answer: user_answer.into(),
            score,
            feedback: None,
            timestamp,
        })
    }

    /// Attach raw evaluator feedback.
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

/// Reject scores that are non-finite or outside `[0, 100]`.
pub fn validate_score(score: f64) -> Result<(), EngineError> {
    if score.is_finite() && (0.0..=100.0).contains(&score) {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "score {score} is outside [0, 100]"
        )))
    }
}

/// Completion state of a module for one learner and language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub module_code: ModuleCode,
    pub language: Language,
    pub completed: bool,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub day: Option<u32>,
}

impl ProgressRecord {
    /// The upsert conflict key.
    pub fn key(&self) -> ProgressKey {
        ProgressKey {
            user_id: self.user_id.clone(),
            module_code: self.module_code.clone(),
            language: self.language,
        }
    }
}

/// Uniqueness constraint for progress records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub user_id: String,
    pub module_code: ModuleCode,
    pub language: Language,
}

/// Explicit learner scope passed into every engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub language: Language,
}

impl Session {
    pub fn new(user_id: impl Into<String>, language: Language) -> Self {
        Self {
            user_id: user_id.into(),
            language,
        }
    }
}
