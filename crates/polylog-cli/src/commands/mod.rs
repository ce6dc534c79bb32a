pub mod complete;
pub mod dashboard;
pub mod days;
pub mod grade;
pub mod init;
pub mod review;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use polylog_core::engine::PracticeEngine;
use polylog_core::model::Session;
use polylog_core::store::FileStore;
use polylog_core::traits::ContentQuery;
use polylog_providers::config::{create_evaluator, load_config_from, PolylogConfig};

use crate::{ContentArgs, SessionArgs};

/// Load config and open a file-backed engine with the configured evaluator.
pub(crate) fn open_engine(config_path: Option<PathBuf>) -> Result<(PracticeEngine, PolylogConfig)> {
    let config = load_config_from(config_path.as_deref())?;
    let engine = build_engine(&config)?;
    Ok((engine, config))
}

pub(crate) fn build_engine(config: &PolylogConfig) -> Result<PracticeEngine> {
    let content_dir = Some(config.content_dir.as_path()).filter(|p| p.is_dir());
    if content_dir.is_none() {
        tracing::warn!(
            "content directory {} not found, no questions loaded",
            config.content_dir.display()
        );
    }
    let store = Arc::new(
        FileStore::open(&config.data_dir, content_dir)
            .with_context(|| format!("failed to open data dir {}", config.data_dir.display()))?,
    );

    let evaluator = create_evaluator(&config.evaluator)?;
    Ok(PracticeEngine::with_store(store, config.engine_config()).with_evaluator(evaluator))
}

pub(crate) fn session(args: &SessionArgs) -> Session {
    Session::new(args.user.clone(), args.language)
}

pub(crate) fn query(language: polylog_core::model::Language, args: &ContentArgs) -> ContentQuery {
    ContentQuery {
        language,
        module_id: args.module.clone(),
        test_id: args.test.clone(),
        mode: args.mode,
        day: args.day,
    }
}
