//! Hosted assistant connection settings.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Assistant used when none is configured.
pub const DEFAULT_ASSISTANT_ID: &str = "asst_vvaFZVcZ4wbm3yetLeB3CTgj";

/// Configuration for the assistant service client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// API base URL, including the version segment.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key. Usually supplied through `OPENAI_API_KEY` rather than a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Assistant that runs the analysis.
    #[serde(default = "default_assistant_id")]
    pub assistant_id: String,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_assistant_id() -> String {
    DEFAULT_ASSISTANT_ID.to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl AssistantConfig {
    /// Base default without env overrides.
    pub fn base_default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            assistant_id: default_assistant_id(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `OPENAI_API_KEY`: API key
    /// - `OPENAI_BASE_URL`: API base URL
    /// - `ASSISTANT_ID`: assistant to run
    /// - `ASSISTANT_REQUEST_TIMEOUT`: HTTP timeout in seconds
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(endpoint) = lookup("OPENAI_BASE_URL") {
            self.endpoint = endpoint;
        }
        if let Some(id) = lookup("ASSISTANT_ID") {
            self.assistant_id = id;
        }
        if let Some(val) = lookup("ASSISTANT_REQUEST_TIMEOUT") {
            match val.parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid ASSISTANT_REQUEST_TIMEOUT: {}", val),
            }
        }
        self
    }

    /// The API key, or an error explaining how to provide one.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Copy with the API key masked, for display.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: self.api_key.as_deref().map(redact_key),
            ..self.clone()
        }
    }
}

/// Mask all but the last four characters of a secret.
fn redact_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_base_default() {
        let config = AssistantConfig::base_default();
        assert_eq!(config.endpoint, "https://api.openai.com/v1");
        assert_eq!(config.assistant_id, DEFAULT_ASSISTANT_ID);
        assert!(config.api_key.is_none());
        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_overrides() {
        let config = AssistantConfig::base_default().with_overrides(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test-1234567890"),
            ("OPENAI_BASE_URL", "http://localhost:9999/v1"),
            ("ASSISTANT_ID", "asst_other"),
            ("ASSISTANT_REQUEST_TIMEOUT", "30"),
        ]));
        assert_eq!(config.api_key().unwrap(), "sk-test-1234567890");
        assert_eq!(config.endpoint, "http://localhost:9999/v1");
        assert_eq!(config.assistant_id, "asst_other");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_blank_and_invalid_overrides_ignored() {
        let config = AssistantConfig::base_default().with_overrides(lookup_from(&[
            ("OPENAI_API_KEY", "   "),
            ("ASSISTANT_REQUEST_TIMEOUT", "soon"),
        ]));
        assert!(config.api_key.is_none());
        assert_eq!(config.request_timeout_secs, 120);
    }

    #[test]
    fn test_redacted() {
        let mut config = AssistantConfig::base_default();
        config.api_key = Some("sk-abcdefghijklmnop".to_string());
        assert_eq!(config.redacted().api_key.as_deref(), Some("****mnop"));

        config.api_key = Some("short".to_string());
        assert_eq!(config.redacted().api_key.as_deref(), Some("****"));
    }
}
