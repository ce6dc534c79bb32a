//! Store implementations.
//!
//! `MemoryStore` keeps everything in process and supports fault injection;
//! `FileStore` persists results and progress as JSON files in a data
//! directory and serves content loaded from a content directory.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::content::ContentDocument;
use crate::error::EngineError;
use crate::model::{ContentMode, Language, ProgressRecord, QuestionItem};
use crate::traits::ContentQuery;

fn find_document<'a>(
    docs: &'a [ContentDocument],
    language: Language,
    module_id: &str,
    test_id: &str,
    mode: ContentMode,
) -> Result<&'a ContentDocument, EngineError> {
    docs.iter()
        .find(|d| d.matches(language, module_id, test_id, mode))
        .ok_or_else(|| {
            EngineError::NotFound(format!(
                "content {module_id}-{test_id} ({language}, {mode})"
            ))
        })
}

pub(crate) fn lookup_questions(
    docs: &[ContentDocument],
    query: &ContentQuery,
) -> Result<Vec<QuestionItem>, EngineError> {
    find_document(
        docs,
        query.language,
        &query.module_id,
        &query.test_id,
        query.mode,
    )?
    .questions(query.day)
}

pub(crate) fn lookup_max_day(
    docs: &[ContentDocument],
    language: Language,
    module_id: &str,
    test_id: &str,
    mode: ContentMode,
) -> Result<u32, EngineError> {
    Ok(find_document(docs, language, module_id, test_id, mode)?.max_day())
}

/// Insert or replace by conflict key.
pub(crate) fn upsert_into(records: &mut Vec<ProgressRecord>, record: ProgressRecord) {
    let key = record.key();
    match records.iter_mut().find(|r| r.key() == key) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}
