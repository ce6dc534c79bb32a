//! The `polylog validate` command.

use std::path::PathBuf;

use anyhow::Result;

use polylog_core::content::{load_content_directory, parse_content_file, validate_content};

pub fn execute(content_path: PathBuf) -> Result<()> {
    let docs = if content_path.is_dir() {
        load_content_directory(&content_path)?
    } else {
        parse_content_file(&content_path)?
    };

    let mut total_warnings = 0;

    for doc in &docs {
        let questions: usize = doc.content.values().map(Vec::len).sum();
        println!(
            "Content: {} {}-{} {} ({} days, {} questions)",
            doc.language,
            doc.module_id,
            doc.test_id,
            doc.mode,
            doc.content.len(),
            questions
        );

        let warnings = validate_content(doc);
        for w in &warnings {
            let prefix = match (&w.day, &w.question_id) {
                (Some(day), Some(id)) => format!("  [day {day} / {id}]"),
                (Some(day), None) => format!("  [day {day}]"),
                (None, Some(id)) => format!("  [{id}]"),
                (None, None) => "  ".to_string(),
            };
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All content valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
