use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::content::ContentDocument;
use crate::error::EngineError;
use crate::model::{ContentMode, Language, ProgressRecord, QuestionItem, ResponseRecord};
use crate::traits::{ContentQuery, ContentStore, ProgressStore, ResultFilter, ResultStore};

/// In-process store for content, results, and progress.
///
/// `set_available(false)` makes every operation fail with a persistence
/// error, for exercising failure paths.
#[derive(Default)]
pub struct MemoryStore {
    content: Mutex<Vec<ContentDocument>>,
    results: Mutex<Vec<ResponseRecord>>,
    progress: Mutex<Vec<ProgressRecord>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(docs: Vec<ContentDocument>) -> Self {
        Self {
            content: Mutex::new(docs),
            ..Self::default()
        }
    }

    pub fn add_content(&self, doc: ContentDocument) -> Result<(), EngineError> {
        lock(&self.content)?.push(doc);
        Ok(())
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of stored response records across all users.
    pub fn result_count(&self) -> usize {
        self.results.lock().map(|r| r.len()).unwrap_or_default()
    }

    fn check(&self) -> Result<(), EngineError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(EngineError::Persistence("store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, EngineError> {
    mutex
        .lock()
        .map_err(|_| EngineError::Persistence("store lock poisoned".into()))
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get(&self, query: &ContentQuery) -> Result<Vec<QuestionItem>, EngineError> {
        self.check()?;
        super::lookup_questions(&lock(&self.content)?, query)
    }

    async fn available_days(
        &self,
        language: Language,
        module_id: &str,
        test_id: &str,
        mode: ContentMode,
    ) -> Result<u32, EngineError> {
        self.check()?;
        super::lookup_max_day(&lock(&self.content)?, language, module_id, test_id, mode)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn append(&self, records: &[ResponseRecord]) -> Result<(), EngineError> {
        self.check()?;
        lock(&self.results)?.extend_from_slice(records);
        Ok(())
    }

    async fn read(
        &self,
        user_id: &str,
        language: Language,
        filter: &ResultFilter,
    ) -> Result<Vec<ResponseRecord>, EngineError> {
        self.check()?;
        Ok(lock(&self.results)?
            .iter()
            .filter(|r| r.user_id == user_id && r.language == language && filter.matches(r))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn upsert(&self, record: ProgressRecord) -> Result<(), EngineError> {
        self.check()?;
        let mut progress = lock(&self.progress)?;
        super::upsert_into(&mut progress, record);
        Ok(())
    }

    async fn read(
        &self,
        user_id: &str,
        language: Language,
        completed_only: bool,
    ) -> Result<Vec<ProgressRecord>, EngineError> {
        self.check()?;
        Ok(lock(&self.progress)?
            .iter()
            .filter(|r| r.user_id == user_id && r.language == language)
            .filter(|r| !completed_only || r.completed)
            .cloned()
            .collect())
    }
}
