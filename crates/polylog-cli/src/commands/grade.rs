//! The `polylog grade` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use polylog_core::engine::GradedBatch;
use polylog_core::model::TestMode;

use crate::{ContentArgs, SessionArgs};

pub async fn execute(
    config_path: Option<PathBuf>,
    session_args: SessionArgs,
    content_args: ContentArgs,
    modality: TestMode,
    answers: Vec<String>,
) -> Result<()> {
    let (engine, _config) = super::open_engine(config_path)?;
    let session = super::session(&session_args);
    let query = super::query(session.language, &content_args);

    let batch = match modality {
        TestMode::MultipleChoice | TestMode::ListeningComprehension => {
            let selections = parse_selections(&answers)?;
            engine
                .submit_choices(&session, &query, &selections, modality)
                .await?
        }
        TestMode::SpeechAccuracy => engine.submit_speech(&session, &query, &answers).await?,
        TestMode::AiReview => {
            anyhow::bail!("translations are graded with `polylog review`")
        }
    };

    print_batch(&batch);
    println!("Total: {:.1}/100", batch.total);
    Ok(())
}

/// Option indices, with `-` marking a skipped question.
fn parse_selections(answers: &[String]) -> Result<Vec<Option<usize>>> {
    answers
        .iter()
        .map(|a| match a.trim() {
            "-" | "" => Ok(None),
            s => s
                .parse::<usize>()
                .map(Some)
                .with_context(|| format!("invalid option index: '{s}'")),
        })
        .collect()
}

fn print_batch(batch: &GradedBatch) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct", "Score", "Credit"]);

    for item in &batch.items {
        table.add_row(vec![
            Cell::new(&item.question_id),
            Cell::new(&item.question_text),
            Cell::new(&item.user_answer),
            Cell::new(&item.correct_answer),
            Cell::new(format!("{:.1}", item.score)),
            Cell::new(format!("{:.1}", item.credit)),
        ]);
    }

    println!("{table}");
}
