//! The `polylog complete` command.

use std::path::PathBuf;

use anyhow::Result;

use crate::{ContentArgs, SessionArgs};

pub async fn execute(
    config_path: Option<PathBuf>,
    session_args: SessionArgs,
    content_args: ContentArgs,
) -> Result<()> {
    let (engine, _config) = super::open_engine(config_path)?;
    let session = super::session(&session_args);
    let module_code = super::query(session.language, &content_args).module_code();

    let record = engine
        .record_completion(&session, &module_code, content_args.day)
        .await?;
    println!(
        "Completed {} for {} at {}",
        record.module_code,
        record.user_id,
        record.completed_at.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}
