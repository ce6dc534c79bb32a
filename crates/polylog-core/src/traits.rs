//! Collaborator trait definitions.
//!
//! The engine never reaches for a global client: content, results, progress,
//! the AI reviewer, and speech capabilities are all passed in as handles
//! implementing these traits. `store` provides in-memory and file-backed
//! implementations; `polylog-providers` implements `Evaluator`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, TransportError};
use crate::model::{
    ContentMode, Language, ModuleCode, ProgressRecord, QuestionItem, ResponseRecord,
};

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Identifies one day (or all days) of a test's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentQuery {
    pub language: Language,
    pub module_id: String,
    pub test_id: String,
    pub mode: ContentMode,
    /// `None` selects every day, in ascending day order.
    #[serde(default)]
    pub day: Option<u32>,
}

impl ContentQuery {
    /// Module code recorded for responses to this content.
    pub fn module_code(&self) -> ModuleCode {
        let day = self.day.map(|d| d.to_string()).unwrap_or_default();
        ModuleCode::from_parts([self.module_id.as_str(), self.test_id.as_str(), day.as_str()])
    }
}

/// Read access to question content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Ordered questions for the query.
    async fn get(&self, query: &ContentQuery) -> Result<Vec<QuestionItem>, EngineError>;

    /// Highest day number available for a test, 0 when there is none.
    async fn available_days(
        &self,
        language: Language,
        module_id: &str,
        test_id: &str,
        mode: ContentMode,
    ) -> Result<u32, EngineError>;
}

/// Narrows a result read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    /// Only records whose module category matches.
    #[serde(default)]
    pub category: Option<String>,
    /// Only records at or after this instant.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

impl ResultFilter {
    pub fn matches(&self, record: &ResponseRecord) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| record.module_code.category() == c);
        let since_ok = self.since.map_or(true, |s| record.timestamp >= s);
        category_ok && since_ok
    }

    /// Same narrowing applied to progress, by completion time.
    pub fn matches_progress(&self, record: &ProgressRecord) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| record.module_code.category() == c);
        let since_ok = self.since.map_or(true, |s| record.completed_at >= s);
        category_ok && since_ok
    }
}

/// Append-only storage of scored responses.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn append(&self, records: &[ResponseRecord]) -> Result<(), EngineError>;

    async fn read(
        &self,
        user_id: &str,
        language: Language,
        filter: &ResultFilter,
    ) -> Result<Vec<ResponseRecord>, EngineError>;
}

/// Completion state keyed by (user, module code, language).
///
/// Implementations must make `upsert` atomic with respect to the conflict key.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn upsert(&self, record: ProgressRecord) -> Result<(), EngineError>;

    async fn read(
        &self,
        user_id: &str,
        language: Language,
        completed_only: bool,
    ) -> Result<Vec<ProgressRecord>, EngineError>;
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Request for an AI review of one translated sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub user_id: String,
    pub module_code: ModuleCode,
    /// Source sentence the learner translated.
    pub sentence: String,
    /// The learner's translation.
    pub user_input: String,
    pub language: Language,
}

/// External AI reviewer.
///
/// Returns the raw feedback payload; validation is left to the rubric parser.
/// Timeouts are enforced by the implementation's transport and surfaced as
/// `TransportError::Timeout`.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Human-readable evaluator name (e.g. "http").
    fn name(&self) -> &str;

    async fn review(&self, request: &ReviewRequest) -> Result<serde_json::Value, EngineError>;
}

// ---------------------------------------------------------------------------
// Speech capabilities
// ---------------------------------------------------------------------------

/// Text to be spoken aloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub locale: String,
}

/// Produces a transcript of what the learner said. Never exposes audio.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, language: Language, prompt: &str) -> Result<String, TransportError>;
}

/// Speaks text to the learner. Never exposes audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, utterance: &Utterance) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(module: &str, ts: i64) -> ResponseRecord {
        ResponseRecord::new(
            "u",
            module.into(),
            Language::English,
            "q",
            "a",
            50.0,
            DateTime::<Utc>::from_timestamp(ts, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn content_query_module_code() {
        let mut query = ContentQuery {
            language: Language::English,
            module_id: "300".into(),
            test_id: "301".into(),
            mode: ContentMode::Review,
            day: Some(4),
        };
        assert_eq!(query.module_code().as_str(), "300-301-4");
        query.day = None;
        assert_eq!(query.module_code().as_str(), "300-301");
    }

    #[test]
    fn filter_by_category_and_since() {
        let filter = ResultFilter {
            category: Some("200".into()),
            since: DateTime::<Utc>::from_timestamp(1_000, 0),
        };
        assert!(filter.matches(&record("200-1-2", 1_000)));
        assert!(!filter.matches(&record("200-1-2", 999)));
        assert!(!filter.matches(&record("300-1-2", 5_000)));
        assert!(ResultFilter::default().matches(&record("300-1-2", 0)));
    }
}
