use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::content::{load_content_directory, ContentDocument};
use crate::error::EngineError;
use crate::model::{ContentMode, Language, ProgressRecord, QuestionItem, ResponseRecord};
use crate::traits::{ContentQuery, ContentStore, ProgressStore, ResultFilter, ResultStore};

const RESULTS_FILE: &str = "results.json";
const PROGRESS_FILE: &str = "progress.json";

/// JSON-file backed store.
///
/// Results and progress live in `results.json` and `progress.json` under the
/// data directory. Writers hold the lock exclusively across each
/// read-modify-write, readers share it. Files are replaced by renaming a
/// fully written temp file over them, so a crash mid-write leaves the
/// previous contents intact.
pub struct FileStore {
    data_dir: PathBuf,
    content: Vec<ContentDocument>,
    lock: RwLock<()>,
}

impl FileStore {
    /// Open a store rooted at `data_dir`, loading content documents from
    /// `content_dir` when given.
    pub fn open(data_dir: &Path, content_dir: Option<&Path>) -> anyhow::Result<Self> {
        let content = match content_dir {
            Some(dir) => load_content_directory(dir)?,
            None => Vec::new(),
        };
        tracing::debug!(
            "opened file store at {} with {} content documents",
            data_dir.display(),
            content.len()
        );
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            content,
            lock: RwLock::new(()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn content(&self) -> &[ContentDocument] {
        &self.content
    }

    async fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, EngineError> {
        let path = self.data_dir.join(name);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(EngineError::Persistence(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        serde_json::from_str(&raw).map_err(|e| {
            EngineError::Persistence(format!("failed to parse {}: {e}", path.display()))
        })
    }

    async fn save<T: Serialize>(&self, name: &str, records: &[T]) -> Result<(), EngineError> {
        let path = self.data_dir.join(name);
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| EngineError::Persistence(format!("failed to serialize {name}: {e}")))?;
        let dir = self.data_dir.clone();
        tokio::task::spawn_blocking(move || replace_file(&dir, &path, json.as_bytes()))
            .await
            .map_err(|e| EngineError::Persistence(format!("write task for {name} failed: {e}")))?
    }
}

fn replace_file(dir: &Path, path: &Path, contents: &[u8]) -> Result<(), EngineError> {
    let fail = |what: &str, e: &dyn std::fmt::Display| {
        EngineError::Persistence(format!("failed to {what} {}: {e}", path.display()))
    };
    std::fs::create_dir_all(dir).map_err(|e| {
        EngineError::Persistence(format!("failed to create {}: {e}", dir.display()))
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| fail("stage", &e))?;
    tmp.write_all(contents).map_err(|e| fail("write", &e))?;
    tmp.as_file().sync_all().map_err(|e| fail("sync", &e))?;
    tmp.persist(path).map_err(|e| fail("replace", &e.error))?;
    Ok(())
}

#[async_trait]
impl ContentStore for FileStore {
    async fn get(&self, query: &ContentQuery) -> Result<Vec<QuestionItem>, EngineError> {
        super::lookup_questions(&self.content, query)
    }

    async fn available_days(
        &self,
        language: Language,
        module_id: &str,
        test_id: &str,
        mode: ContentMode,
    ) -> Result<u32, EngineError> {
        super::lookup_max_day(&self.content, language, module_id, test_id, mode)
    }
}

#[async_trait]
impl ResultStore for FileStore {
    async fn append(&self, records: &[ResponseRecord]) -> Result<(), EngineError> {
        let _guard = self.lock.write().await;
        let mut all: Vec<ResponseRecord> = self.load(RESULTS_FILE).await?;
        all.extend_from_slice(records);
        self.save(RESULTS_FILE, &all).await
    }

    async fn read(
        &self,
        user_id: &str,
        language: Language,
        filter: &ResultFilter,
    ) -> Result<Vec<ResponseRecord>, EngineError> {
        let all: Vec<ResponseRecord> = {
            let _guard = self.lock.read().await;
            self.load(RESULTS_FILE).await?
        };
        Ok(all
            .into_iter()
            .filter(|r| r.user_id == user_id && r.language == language && filter.matches(r))
            .collect())
    }
}

#[async_trait]
impl ProgressStore for FileStore {
    async fn upsert(&self, record: ProgressRecord) -> Result<(), EngineError> {
        let _guard = self.lock.write().await;
        let mut all: Vec<ProgressRecord> = self.load(PROGRESS_FILE).await?;
        super::upsert_into(&mut all, record);
        self.save(PROGRESS_FILE, &all).await
    }

    async fn read(
        &self,
        user_id: &str,
        language: Language,
        completed_only: bool,
    ) -> Result<Vec<ProgressRecord>, EngineError> {
        let all: Vec<ProgressRecord> = {
            let _guard = self.lock.read().await;
            self.load(PROGRESS_FILE).await?
        };
        Ok(all
            .into_iter()
            .filter(|r| r.user_id == user_id && r.language == language)
            .filter(|r| !completed_only || r.completed)
            .collect())
    }
}
