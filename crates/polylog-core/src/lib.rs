//! polylog-core: scoring, progress tracking, and dashboard analytics.
//!
//! This crate defines the data model, collaborator traits, and the scoring
//! and aggregation logic that the rest of polylog builds on.

pub mod analytics;
pub mod content;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod model;
pub mod progress;
pub mod report;
pub mod scoring;
pub mod similarity;
pub mod store;
pub mod time;
pub mod traits;

pub use error::{EngineError, TransportError};
