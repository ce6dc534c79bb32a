//! Question content documents.
//!
//! Loads `test_content` documents from JSON files and directories, and
//! validates them. A document holds one test's questions for one language and
//! mode, keyed by day number.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{ContentMode, Language, QuestionItem};

/// One test's content for a language and mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentDocument {
    pub language: Language,
    pub module_id: String,
    pub test_id: String,
    pub mode: ContentMode,
    /// Questions keyed by day number (as a string, the way documents store it).
    pub content: BTreeMap<String, Vec<QuestionItem>>,
}

impl ContentDocument {
    pub fn matches(
        &self,
        language: Language,
        module_id: &str,
        test_id: &str,
        mode: ContentMode,
    ) -> bool {
        self.language == language
            && self.module_id == module_id
            && self.test_id == test_id
            && self.mode == mode
    }

    /// Day entries with numeric keys, ordered by day number. Keys that parse
    /// to the same number (`"1"` and `"01"`) keep their map order.
    fn numbered_days(&self) -> Vec<(u32, &Vec<QuestionItem>)> {
        let mut days: Vec<(u32, &Vec<QuestionItem>)> = self
            .content
            .iter()
            .filter_map(|(k, items)| k.trim().parse().ok().map(|d| (d, items)))
            .collect();
        days.sort_by_key(|(d, _)| *d);
        days
    }

    /// Numeric day keys in ascending order. Non-numeric keys are ignored.
    pub fn days(&self) -> Vec<u32> {
        let mut days: Vec<u32> = self.numbered_days().into_iter().map(|(d, _)| d).collect();
        days.dedup();
        days
    }

    /// Highest day number, 0 when the document has no days.
    pub fn max_day(&self) -> u32 {
        self.days().last().copied().unwrap_or(0)
    }

    /// Questions for one day, or every day in ascending order.
    pub fn questions(&self, day: Option<u32>) -> Result<Vec<QuestionItem>, EngineError> {
        let selected: Vec<&Vec<QuestionItem>> = self
            .numbered_days()
            .into_iter()
            .filter(|(d, _)| day.map_or(true, |wanted| *d == wanted))
            .map(|(_, items)| items)
            .collect();

        match day {
            Some(day) if selected.is_empty() => Err(EngineError::NotFound(format!(
                "day {day} of {}-{} ({}, {})",
                self.module_id, self.test_id, self.language, self.mode
            ))),
            _ => Ok(selected.into_iter().flatten().cloned().collect()),
        }
    }
}

/// Intermediate JSON structure for content files. Accepts both the current
/// field names and the older ones (`question`, `question_text`,
/// `correct_text`, `correct`).
#[derive(Debug, Deserialize)]
struct RawContentDocument {
    language: Language,
    module_id: StringOrNumber,
    test_id: StringOrNumber,
    mode: ContentMode,
    #[serde(default)]
    content: BTreeMap<String, Vec<RawQuestion>>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    id: StringOrNumber,
    #[serde(alias = "question", alias = "question_text", default)]
    prompt: String,
    #[serde(default)]
    answers: Vec<String>,
    #[serde(default)]
    correct_text: Option<String>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(alias = "correct", default)]
    correct_option: Option<usize>,
    #[serde(default)]
    word: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(v: StringOrNumber) -> Self {
        match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContentFile {
    Many(Vec<RawContentDocument>),
    One(RawContentDocument),
}

impl From<RawQuestion> for QuestionItem {
    fn from(q: RawQuestion) -> Self {
        let mut answers = q.answers;
        if let Some(text) = q.correct_text {
            if !answers.contains(&text) {
                answers.insert(0, text);
            }
        }
        QuestionItem {
            id: q.id.into(),
            prompt: q.prompt,
            answers,
            options: q.options,
            correct_option: q.correct_option,
            word: q.word,
        }
    }
}

impl From<RawContentDocument> for ContentDocument {
    fn from(raw: RawContentDocument) -> Self {
        ContentDocument {
            language: raw.language,
            module_id: raw.module_id.into(),
            test_id: raw.test_id.into(),
            mode: raw.mode,
            content: raw
                .content
                .into_iter()
                .map(|(day, items)| (day, items.into_iter().map(QuestionItem::from).collect()))
                .collect(),
        }
    }
}

/// Parse a single JSON file into content documents.
pub fn parse_content_file(path: &Path) -> Result<Vec<ContentDocument>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content file: {}", path.display()))?;

    parse_content_str(&content, path)
}

/// Parse a JSON string holding one document or an array of documents.
pub fn parse_content_str(content: &str, source_path: &Path) -> Result<Vec<ContentDocument>> {
    let parsed: RawContentFile = serde_json::from_str(content)
        .with_context(|| format!("failed to parse content JSON: {}", source_path.display()))?;

    let docs = match parsed {
        RawContentFile::Many(docs) => docs,
        RawContentFile::One(doc) => vec![doc],
    };
    Ok(docs.into_iter().map(ContentDocument::from).collect())
}

/// Recursively load all `.json` content files from a directory.
pub fn load_content_directory(dir: &Path) -> Result<Vec<ContentDocument>> {
    let mut docs = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            docs.extend(load_content_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            match parse_content_file(&path) {
                Ok(parsed) => docs.extend(parsed),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(docs)
}

/// A warning from content validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The day key (if applicable).
    pub day: Option<String>,
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a content document for common issues.
pub fn validate_content(doc: &ContentDocument) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if doc.content.is_empty() {
        warnings.push(ValidationWarning {
            day: None,
            question_id: None,
            message: "document has no days".into(),
        });
    }

    let mut day_numbers: HashMap<u32, &str> = HashMap::new();
    for (day, items) in &doc.content {
        let warn = |question_id: Option<&str>, message: String| ValidationWarning {
            day: Some(day.clone()),
            question_id: question_id.map(str::to_string),
            message,
        };

        match day.trim().parse::<u32>() {
            Ok(d) if d > 0 => {
                if d.to_string() != *day {
                    warnings.push(warn(None, format!("day key '{day}' should be written '{d}'")));
                }
                if let Some(other) = day_numbers.insert(d, day.as_str()) {
                    warnings.push(warn(
                        None,
                        format!("day keys '{other}' and '{day}' both name day {d}"),
                    ));
                }
            }
            _ => warnings.push(warn(None, format!("day key '{day}' is not a positive number"))),
        }

        let mut seen_ids = HashSet::new();
        for item in items {
            let id = Some(item.id.as_str());
            if !seen_ids.insert(&item.id) {
                warnings.push(warn(id, format!("duplicate question ID: {}", item.id)));
            }
            if item.prompt.trim().is_empty() {
                warnings.push(warn(id, "prompt is empty".into()));
            }
            match (item.options.is_empty(), item.correct_option) {
                (false, None) => {
                    warnings.push(warn(id, "options given but no correct option".into()));
                }
                (_, Some(i)) if i >= item.options.len() => {
                    warnings.push(warn(
                        id,
                        format!(
                            "correct option {i} out of range for {} options",
                            item.options.len()
                        ),
                    ));
                }
                _ => {}
            }
            if item.canonical_answer().is_none() {
                warnings.push(warn(id, "no canonical answer".into()));
            }
        }
    }

    warnings
}
