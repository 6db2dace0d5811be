//! Assistant service error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl AssistantError {
    /// Whether the service answered with 404 for the requested resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssistantError::Api { status: 404, .. })
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        AssistantError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(err: serde_json::Error) -> Self {
        AssistantError::Parse(err.to_string())
    }
}
