//! Rubric feedback parsing.
//!
//! The AI reviewer's payload changed shape over the product's life. Older
//! payloads carry several named criteria plus an overall criterion, each an
//! object with a score and a comment; newer payloads carry a single top-level
//! score. The shape is detected by probing for known keys before any field is
//! read, then parsed along the matching path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::EngineError;

/// Keys that designate the overall criterion in multi-criterion payloads.
pub const OVERALL_KEYS: &[&str] = &["총점", "overall", "total"];

/// Criterion name reported for single-criterion payloads.
pub const SINGLE_CRITERION_NAME: &str = "overall";

const SCORE_KEYS: &[&str] = &["스코어", "score"];
const TEXT_KEYS: &[&str] = &["피드백", "feedback"];

/// Errors produced while validating a feedback payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedbackError {
    #[error("feedback is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("feedback must be a JSON object")]
    NotAnObject,

    #[error("no recognizable overall score key")]
    MissingOverall,

    #[error("more than one overall criterion: {0:?}")]
    AmbiguousOverall(Vec<String>),

    #[error("score for '{criterion}' is not numeric")]
    NonNumericScore { criterion: String },

    #[error("score for '{criterion}' is outside [0, 100]: {score}")]
    OutOfRange { criterion: String, score: f64 },
}

impl From<FeedbackError> for EngineError {
    fn from(err: FeedbackError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

/// Which payload generation a feedback object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVersion {
    LegacyMultiCriterion,
    CurrentSingleCriterion,
}

/// A raw payload classified by shape, borrowing from the source value.
#[derive(Debug, Clone, Copy)]
pub enum FeedbackSchema<'a> {
    Legacy {
        overall_key: &'a str,
        criteria: &'a Map<String, Value>,
    },
    Current {
        root: &'a Map<String, Value>,
    },
}

impl<'a> FeedbackSchema<'a> {
    /// Classify a payload by the keys it carries.
    pub fn detect(value: &'a Value) -> Result<Self, FeedbackError> {
        let root = value.as_object().ok_or(FeedbackError::NotAnObject)?;

        let overall: Vec<&'a str> = root
            .iter()
            .filter(|(k, v)| OVERALL_KEYS.contains(&k.as_str()) && v.is_object())
            .map(|(k, _)| k.as_str())
            .collect();

        match overall.as_slice() {
            [key] => Ok(FeedbackSchema::Legacy {
                overall_key: key,
                criteria: root,
            }),
            [] if root.contains_key("score") => Ok(FeedbackSchema::Current { root }),
            [] => Err(FeedbackError::MissingOverall),
            many => Err(FeedbackError::AmbiguousOverall(
                many.iter().map(|k| k.to_string()).collect(),
            )),
        }
    }

    pub fn version(&self) -> SchemaVersion {
        match self {
            FeedbackSchema::Legacy { .. } => SchemaVersion::LegacyMultiCriterion,
            FeedbackSchema::Current { .. } => SchemaVersion::CurrentSingleCriterion,
        }
    }
}

/// Score and comment for one rubric criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub score: f64,
    pub text: String,
}

/// Canonical shape of a validated feedback payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFeedback {
    pub schema: SchemaVersion,
    /// Every recognized criterion, including the overall one.
    pub criterion_scores: BTreeMap<String, CriterionScore>,
    /// Name of the authoritative criterion.
    pub overall_criterion: String,
    /// The authoritative 0–100 score.
    pub overall_score: f64,
}

impl ParsedFeedback {
    /// Comment attached to the overall criterion.
    pub fn overall_text(&self) -> &str {
        self.criterion_scores
            .get(&self.overall_criterion)
            .map(|c| c.text.as_str())
            .unwrap_or_default()
    }
}

/// Parse feedback stored as JSON text.
pub fn parse_feedback_str(raw: &str) -> Result<ParsedFeedback, FeedbackError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| FeedbackError::InvalidJson(e.to_string()))?;
    parse_feedback(&value)
}

/// Validate a feedback payload and extract its criteria and overall score.
pub fn parse_feedback(value: &Value) -> Result<ParsedFeedback, FeedbackError> {
    let schema = FeedbackSchema::detect(value)?;
    let mut criterion_scores = BTreeMap::new();

    let (overall_criterion, overall_score) = match schema {
        FeedbackSchema::Legacy {
            overall_key,
            criteria,
        } => {
            let overall = criterion(overall_key, &criteria[overall_key])?;
            let overall_score = overall.score;
            criterion_scores.insert(overall_key.to_string(), overall);

            for (name, body) in criteria {
                if name == overall_key || !body.is_object() {
                    continue;
                }
                match criterion(name, body) {
                    Ok(score) => {
                        criterion_scores.insert(name.clone(), score);
                    }
                    Err(e) => tracing::debug!("skipping criterion '{name}': {e}"),
                }
            }
            (overall_key.to_string(), overall_score)
        }
        FeedbackSchema::Current { .. } => {
            let overall = criterion(SINGLE_CRITERION_NAME, value)?;
            let overall_score = overall.score;
            criterion_scores.insert(SINGLE_CRITERION_NAME.to_string(), overall);
            (SINGLE_CRITERION_NAME.to_string(), overall_score)
        }
    };

    Ok(ParsedFeedback {
        schema: schema.version(),
        criterion_scores,
        overall_criterion,
        overall_score,
    })
}

fn criterion(name: &str, body: &Value) -> Result<CriterionScore, FeedbackError> {
    let score_value = first_present(body, SCORE_KEYS).ok_or_else(|| {
        FeedbackError::NonNumericScore {
            criterion: name.to_string(),
        }
    })?;
    let score = numeric(score_value).ok_or_else(|| FeedbackError::NonNumericScore {
        criterion: name.to_string(),
    })?;
    if !(0.0..=100.0).contains(&score) {
        return Err(FeedbackError::OutOfRange {
            criterion: name.to_string(),
            score,
        });
    }

    let text = match first_present(body, TEXT_KEYS) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Ok(CriterionScore { score, text })
}

fn first_present<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| body.get(*k))
}

fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}
