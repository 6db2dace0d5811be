//! Configuration management using the prefer crate for file discovery.
//!
//! Precedence, lowest to highest: built-in defaults, config file,
//! environment variables, command-line flags.

mod assistant;
mod runner;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use assistant::{AssistantConfig, DEFAULT_ASSISTANT_ID};
pub use runner::RunnerConfig;

/// Name used for config file discovery (`contract-analyzer.toml`, ...).
pub const CONFIG_NAME: &str = "contract-analyzer";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("OPENAI_API_KEY is not set. Add it to the environment, a .env file, or the config file")]
    MissingApiKey,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Hosted assistant connection.
    #[serde(default)]
    pub assistant: AssistantConfig,
    /// Retry and polling behaviour.
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration, using `explicit` when given and auto-discovery otherwise.
    ///
    /// An explicit path that cannot be read is an error; a missing discovered
    /// file just yields defaults.
    pub async fn load_with(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from_path(path).await,
            None => Ok(Self::load().await),
        }
    }

    /// Discover a config file in the standard locations.
    pub async fn load() -> Self {
        match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}; using defaults", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports TOML, YAML and JSON based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(&contents, path)?;
        tracing::debug!("Loaded config from {}", path.display());

        config.source_path = Some(path.to_path_buf());
        // Environment wins over the file
        config.assistant = config.assistant.with_env_overrides();
        config.runner = config.runner.with_env_overrides();
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parsed = match ext {
            "toml" => toml::from_str(contents).map_err(|e| e.to_string()),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
            _ => serde_json::from_str(contents).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Copy safe to print.
    pub fn redacted(&self) -> Self {
        Self {
            assistant: self.assistant.redacted(),
            ..self.clone()
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_toml() {
        let path = Path::new("contract-analyzer.toml");
        let config = Config::parse(
            r#"
            [assistant]
            assistant_id = "asst_from_file"

            [runner]
            max_retries = 4
            "#,
            path,
        )
        .unwrap();
        assert_eq!(config.assistant.assistant_id, "asst_from_file");
        assert_eq!(config.runner.max_retries, 4);
        assert_eq!(config.runner.max_polls, 120);
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = Config::parse(
            "runner:\n  poll_interval_secs: 9\n",
            Path::new("config.yaml"),
        )
        .unwrap();
        assert_eq!(yaml.runner.poll_interval_secs, 9);

        let json = Config::parse(
            r#"{"assistant": {"request_timeout_secs": 10}}"#,
            Path::new("config.json"),
        )
        .unwrap();
        assert_eq!(json.assistant.request_timeout_secs, 10);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = Config::parse("[runner\nmax_retries = ", Path::new("bad.toml")).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, PathBuf::from("bad.toml")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_from_path_sets_source() {
        let (_dir, path) = write_config(
            "contract-analyzer.toml",
            "[assistant]\nendpoint = \"http://example.test/v1\"\n",
        );
        let config = Config::load_with(Some(&path)).await.unwrap();
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load_with(Some(&missing)).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_toml_output_redacts_key() {
        let mut config = Config::default();
        config.assistant.api_key = Some("sk-secret-value-9876".to_string());
        let rendered = config.redacted().to_toml().unwrap();
        assert!(rendered.contains("****9876"));
        assert!(!rendered.contains("sk-secret"));
    }
}
