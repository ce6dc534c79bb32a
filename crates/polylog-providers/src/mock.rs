//! Mock evaluator for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use polylog_core::error::{EngineError, TransportError};
use polylog_core::traits::{Evaluator, ReviewRequest};

/// An evaluator that answers without any network calls.
///
/// Returns configurable feedback based on sentence content matching. Without
/// a match, the overall score is the similarity between the learner's input
/// and the source sentence, which is enough to exercise the pipeline offline.
pub struct MockEvaluator {
    /// Map of sentence substring → feedback payload.
    responses: HashMap<String, serde_json::Value>,
    /// Sentence substrings that fail with a timeout.
    failing: Vec<String>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<ReviewRequest>>,
}

impl MockEvaluator {
    pub fn new(responses: HashMap<String, serde_json::Value>) -> Self {
        Self {
            responses,
            failing: Vec::new(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Make requests whose sentence contains `needle` time out.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failing.push(needle.to_string());
        self
    }

    /// Get the number of calls made to this evaluator.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this evaluator.
    pub fn last_request(&self) -> Option<ReviewRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

impl Default for MockEvaluator {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

#[async_trait]
impl Evaluator for MockEvaluator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn review(&self, request: &ReviewRequest) -> Result<serde_json::Value, EngineError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if self
            .failing
            .iter()
            .any(|needle| request.sentence.contains(needle.as_str()))
        {
            return Err(TransportError::Timeout(0).into());
        }

        let feedback = self
            .responses
            .iter()
            .find(|(key, _)| request.sentence.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| {
                let score =
                    polylog_core::similarity::similarity(&request.user_input, &request.sentence);
                serde_json::json!({
                    "score": score.round(),
                    "feedback": "mock review",
                })
            });

        Ok(feedback)
    }
}
