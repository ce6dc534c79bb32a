//! The `polylog days` command.

use std::path::PathBuf;

use anyhow::Result;

use polylog_core::model::Language;

use crate::ContentArgs;

pub async fn execute(
    config_path: Option<PathBuf>,
    language: Language,
    content_args: ContentArgs,
) -> Result<()> {
    let (engine, _config) = super::open_engine(config_path)?;
    let days = engine
        .available_days(
            language,
            &content_args.module,
            &content_args.test,
            content_args.mode,
        )
        .await;
    println!(
        "{}-{} ({language}, {}): {days} day(s)",
        content_args.module, content_args.test, content_args.mode
    );
    Ok(())
}
