//! Retry and polling settings for the analysis runner.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Configuration for the retry-and-validate loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Attempts per document (each attempt uploads a fresh copy).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Seconds between run status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Polls per attempt before the run counts as failed (0 = unbounded).
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_max_retries() -> u32 {
    3
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_polls() -> u32 {
    120
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl RunnerConfig {
    pub fn base_default() -> Self {
        Self {
            max_retries: default_max_retries(),
            poll_interval_secs: default_poll_interval(),
            max_polls: default_max_polls(),
        }
    }

    /// Apply `ANALYSIS_MAX_RETRIES`, `ANALYSIS_POLL_INTERVAL` and
    /// `ANALYSIS_MAX_POLLS` from the environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(n) = parse_var(&lookup, "ANALYSIS_MAX_RETRIES") {
            self.max_retries = n;
        }
        if let Some(n) = parse_var(&lookup, "ANALYSIS_POLL_INTERVAL") {
            self.poll_interval_secs = n;
        }
        if let Some(n) = parse_var(&lookup, "ANALYSIS_MAX_POLLS") {
            self.max_polls = n;
        }
        self
    }

    /// Apply command-line flags on top of file and env settings.
    pub fn with_cli_overrides(
        mut self,
        max_retries: Option<u32>,
        poll_interval_secs: Option<u64>,
        max_polls: Option<u32>,
    ) -> Self {
        if let Some(n) = max_retries {
            self.max_retries = n;
        }
        if let Some(n) = poll_interval_secs {
            self.poll_interval_secs = n;
        }
        if let Some(n) = max_polls {
            self.max_polls = n;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}: {}", key, raw);
            None
        }
    }
}
