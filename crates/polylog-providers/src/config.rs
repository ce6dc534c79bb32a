//! Configuration loading and evaluator factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use polylog_core::analytics::AnalyticsConfig;
use polylog_core::engine::EngineConfig;
use polylog_core::traits::Evaluator;

use crate::http::{HttpEvaluator, DEFAULT_TIMEOUT_SECS};
use crate::mock::MockEvaluator;

/// Which evaluator reviews free-form answers.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EvaluatorConfig {
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
    #[default]
    Mock,
}

impl std::fmt::Debug for EvaluatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluatorConfig::Http {
                base_url,
                api_key,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            EvaluatorConfig::Mock => f.write_str("Mock"),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Top-level polylog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolylogConfig {
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    /// Where results and progress are stored.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Where content documents are loaded from.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    /// Max concurrent evaluator requests.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./polylog-data")
}
fn default_content_dir() -> PathBuf {
    PathBuf::from("./content")
}
fn default_parallelism() -> usize {
    4
}

impl Default for PolylogConfig {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorConfig::default(),
            data_dir: default_data_dir(),
            content_dir: default_content_dir(),
            parallelism: default_parallelism(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl PolylogConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            parallelism: self.parallelism.max(1),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_evaluator_config(config: &EvaluatorConfig) -> EvaluatorConfig {
    match config {
        EvaluatorConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => EvaluatorConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_key: api_key.as_ref().map(|k| resolve_env_vars(k)),
            timeout_secs: *timeout_secs,
        },
        EvaluatorConfig::Mock => EvaluatorConfig::Mock,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `polylog.toml` in the current directory
/// 2. `~/.config/polylog/config.toml`
///
/// Environment variable overrides: `POLYLOG_EVALUATOR_URL`, `POLYLOG_EVALUATOR_KEY`.
pub fn load_config() -> Result<PolylogConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<PolylogConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("polylog.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => PolylogConfig::default(),
    };

    apply_env_overrides(&mut config);
    config.evaluator = resolve_evaluator_config(&config.evaluator);
    tracing::debug!("loaded config: {config:?}");

    Ok(config)
}

/// Parse a TOML config document.
pub fn parse_config(content: &str) -> Result<PolylogConfig> {
    Ok(toml::from_str::<PolylogConfig>(content)?)
}

fn apply_env_overrides(config: &mut PolylogConfig) {
    if let Ok(url) = std::env::var("POLYLOG_EVALUATOR_URL") {
        match &mut config.evaluator {
            EvaluatorConfig::Http { base_url, .. } => *base_url = url,
            EvaluatorConfig::Mock => {
                config.evaluator = EvaluatorConfig::Http {
                    base_url: url,
                    api_key: None,
                    timeout_secs: DEFAULT_TIMEOUT_SECS,
                };
            }
        }
    }

    if let Ok(key) = std::env::var("POLYLOG_EVALUATOR_KEY") {
        if let EvaluatorConfig::Http { api_key, .. } = &mut config.evaluator {
            *api_key = Some(key);
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("polylog"))
}

/// Create an evaluator instance from its configuration.
pub fn create_evaluator(config: &EvaluatorConfig) -> Result<Arc<dyn Evaluator>> {
    match config {
        EvaluatorConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => {
            if base_url.is_empty() {
                anyhow::bail!("evaluator base_url is empty");
            }
            Ok(Arc::new(HttpEvaluator::new(
                base_url,
                api_key.clone(),
                *timeout_secs,
            )?))
        }
        EvaluatorConfig::Mock => Ok(Arc::new(MockEvaluator::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_POLYLOG_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_POLYLOG_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_POLYLOG_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_POLYLOG_UNSET_VAR}"), "");
        assert_eq!(resolve_env_vars("no ${closing"), "no ${closing");
        std::env::remove_var("_POLYLOG_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = PolylogConfig::default();
        assert!(matches!(config.evaluator, EvaluatorConfig::Mock));
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.engine_config().parallelism, 4);
        assert_eq!(config.analytics.average_score_goal, 85.0);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
data_dir = "/var/lib/polylog"
content_dir = "/srv/content"
parallelism = 8

[evaluator]
type = "http"
base_url = "https://review.example.com"
api_key = "${_POLYLOG_TEST_KEY}"

[analytics]
study_days_goal = 20

[analytics.module_labels]
100 = "발음"
"#;
        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/polylog"));
        assert_eq!(config.analytics.study_days_goal, 20.0);
        assert_eq!(config.analytics.label_for("100"), "발음");
        match &config.evaluator {
            EvaluatorConfig::Http { timeout_secs, .. } => {
                assert_eq!(*timeout_secs, DEFAULT_TIMEOUT_SECS)
            }
            other => panic!("expected http evaluator, got {other:?}"),
        }

        std::env::set_var("_POLYLOG_TEST_KEY", "sk-secret");
        let resolved = resolve_evaluator_config(&config.evaluator);
        std::env::remove_var("_POLYLOG_TEST_KEY");
        match &resolved {
            EvaluatorConfig::Http { api_key, .. } => {
                assert_eq!(api_key.as_deref(), Some("sk-secret"))
            }
            other => panic!("expected http evaluator, got {other:?}"),
        }
        assert!(!format!("{resolved:?}").contains("sk-secret"));
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polylog.toml");
        std::fs::write(&path, "parallelism = 2\n[evaluator]\ntype = \"mock\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.parallelism, 2);

        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn invalid_toml_is_rejected() {
        assert!(parse_config("parallelism = \"many\"").is_err());
    }

    #[test]
    fn create_mock_and_http_evaluators() {
        let mock = create_evaluator(&EvaluatorConfig::Mock).unwrap();
        assert_eq!(mock.name(), "mock");

        let http = create_evaluator(&EvaluatorConfig::Http {
            base_url: "http://localhost:9".into(),
            api_key: None,
            timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(http.name(), "http");

        assert!(create_evaluator(&EvaluatorConfig::Http {
            base_url: String::new(),
            api_key: None,
            timeout_secs: 1,
        })
        .is_err());
    }
}
