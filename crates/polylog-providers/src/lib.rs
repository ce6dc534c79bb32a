//! polylog-providers: evaluator integrations.
//!
//! Implements the `Evaluator` trait for the HTTP review service and an
//! offline mock, and loads the polylog configuration that selects between
//! them.

pub mod config;
pub mod http;
pub mod mock;

pub use config::{create_evaluator, load_config, load_config_from, EvaluatorConfig, PolylogConfig};
pub use http::HttpEvaluator;
pub use mock::MockEvaluator;
