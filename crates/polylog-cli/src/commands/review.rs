//! The `polylog review` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, Table};

use polylog_core::engine::{ProgressReporter, ReviewBatch, ReviewOutcome};
use polylog_providers::config::load_config_from;

use crate::{ContentArgs, SessionArgs};

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_review_start(&self, index: usize, question: &str) {
        eprintln!("  Reviewing #{}: {question}", index + 1);
    }

    fn on_review_complete(&self, index: usize, score: f64) {
        eprintln!("  Done: #{} scored {score:.1}", index + 1);
    }

    fn on_review_error(&self, index: usize, error: &str) {
        eprintln!("  ERROR: #{}: {error}", index + 1);
    }

    fn on_batch_complete(&self, total: usize, succeeded: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {succeeded}/{total} reviewed, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    config_path: Option<PathBuf>,
    session_args: SessionArgs,
    content_args: ContentArgs,
    answers: Vec<String>,
    parallelism: Option<usize>,
) -> Result<()> {
    if let Some(p) = parallelism {
        anyhow::ensure!(p >= 1, "parallelism must be at least 1");
    }
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(p) = parallelism {
        config.parallelism = p;
    }
    let engine = super::build_engine(&config)?;
    let session = super::session(&session_args);
    let query = super::query(session.language, &content_args);

    eprintln!(
        "polylog v{}: reviewing {} answers for {}",
        env!("CARGO_PKG_VERSION"),
        answers.len(),
        query.module_code()
    );

    let batch = engine
        .review_batch(&session, &query, &answers, &ConsoleReporter)
        .await?;

    print_batch(&batch);
    Ok(())
}

fn print_batch(batch: &ReviewBatch) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Sentence", "Your answer", "Score", "Feedback"]);

    for item in &batch.items {
        let (score, feedback) = match &item.outcome {
            ReviewOutcome::Reviewed { feedback, .. } => (
                format!("{:.1}", feedback.overall_score),
                feedback.overall_text().to_string(),
            ),
            ReviewOutcome::Failed(e) => ("-".to_string(), format!("failed: {e}")),
        };
        table.add_row(vec![
            Cell::new(item.index + 1),
            Cell::new(&item.question_text),
            Cell::new(&item.user_answer),
            Cell::new(score),
            Cell::new(feedback),
        ]);
    }

    println!("{table}");
}
