//! Batch credit normalization.
//!
//! A question batch is worth 100 points in total. Each item's share is
//! `100 / N`, paid in full for a correct discrete answer and scaled by the
//! similarity for continuous outcomes.

use serde::{Deserialize, Serialize};

/// The outcome of a single question.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// Right or wrong.
    Discrete(bool),
    /// Graded similarity in `[0, 1]`.
    Similarity(f64),
}

impl Outcome {
    /// Build a continuous outcome from a 0–100 percentage.
    pub fn from_percent(percent: f64) -> Self {
        Outcome::Similarity(percent / 100.0)
    }

    fn weight(&self) -> f64 {
        match *self {
            Outcome::Discrete(true) => 1.0,
            Outcome::Discrete(false) => 0.0,
            Outcome::Similarity(s) if s.is_nan() => 0.0,
            Outcome::Similarity(s) => s.clamp(0.0, 1.0),
        }
    }
}

/// Distribute 100 points across `outcomes`.
///
/// Returns one credit per outcome; an empty batch yields an empty result.
pub fn normalize_credits(outcomes: &[Outcome]) -> Vec<f64> {
    if outcomes.is_empty() {
        return Vec::new();
    }
    let share = 100.0 / outcomes.len() as f64;
    outcomes.iter().map(|o| share * o.weight()).collect()
}

/// Sum of a batch's credits.
pub fn total(credits: &[f64]) -> f64 {
    credits.iter().sum()
}
