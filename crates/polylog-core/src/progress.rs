//! Module completion tracking.

use std::sync::Arc;

use crate::error::EngineError;
use crate::model::{Language, ModuleCode, ProgressRecord};
use crate::time::Clock;
use crate::traits::ProgressStore;

/// Marks modules complete for a learner.
///
/// The recorder owns no locks: repeated submissions for the same
/// (user, module code, language) rely on the store's atomic upsert, so the
/// last write wins and exactly one record remains. Store failures are
/// returned to the caller unchanged; there is no retry here.
pub struct ProgressRecorder {
    store: Arc<dyn ProgressStore>,
    clock: Clock,
}

impl ProgressRecorder {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            store,
            clock: Clock::System,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Record completion at the recorder's current time.
    pub async fn upsert(
        &self,
        user_id: &str,
        module_code: &ModuleCode,
        language: Language,
        day: Option<u32>,
    ) -> Result<ProgressRecord, EngineError> {
        let record = ProgressRecord {
            user_id: user_id.to_string(),
            module_code: module_code.clone(),
            language,
            completed: true,
            completed_at: self.clock.now(),
            day,
        };

        self.store.upsert(record.clone()).await.inspect_err(|e| {
            tracing::error!("failed to record completion of {module_code} for {user_id}: {e}");
        })?;

        tracing::info!(
            user = user_id,
            module = %module_code,
            language = %language,
            "module completed"
        );
        Ok(record)
    }

    /// Completed modules for a learner in one language.
    pub async fn read_completed(
        &self,
        user_id: &str,
        language: Language,
    ) -> Result<Vec<ProgressRecord>, EngineError> {
        self.store.read(user_id, language, true).await
    }
}
