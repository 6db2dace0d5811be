//! Hosted assistant service abstraction.
//!
//! The analysis runner only talks to the service through [`AnalysisService`],
//! so the OpenAI client can be swapped for a scripted double in tests.

mod error;
pub mod openai;

pub use error::{AssistantError, Result};
pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_handle!(
    /// Uploaded file on the service. Owned by a single analysis attempt.
    FileHandle
);
opaque_handle!(
    /// Conversation thread holding the instruction message and attachment.
    ThreadHandle
);
opaque_handle!(
    /// One execution of the assistant against a thread.
    RunHandle
);
opaque_handle!(MessageHandle);

/// Lifecycle status of a run, collapsed to what the runner acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Map a service status string onto a run status.
    ///
    /// Unknown values are treated as still pending so a new intermediate
    /// state on the service side never ends a run early.
    pub fn from_api(status: &str) -> Self {
        match status {
            "completed" => RunStatus::Completed,
            "failed" | "expired" | "incomplete" => RunStatus::Failed,
            "cancelled" => RunStatus::Cancelled,
            _ => RunStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Author of a thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Other,
}

impl Role {
    pub fn from_api(role: &str) -> Self {
        match role {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other,
        }
    }
}

/// One content item of a thread message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Content that is already a bare string.
    PlainText(String),
    /// Structured item exposing a nested text value.
    StructuredItem { text: String },
    /// Any other shape (images, file references, ...).
    Unrecognized,
}

impl MessageContent {
    /// Classify a raw JSON content item.
    ///
    /// Accepts `"text"`, `{"text": {"value": "..."}}` and `{"text": "..."}`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => MessageContent::PlainText(s.clone()),
            Value::Object(obj) => match obj.get("text") {
                Some(Value::Object(text)) => match text.get("value") {
                    Some(Value::String(s)) => MessageContent::StructuredItem { text: s.clone() },
                    _ => MessageContent::Unrecognized,
                },
                Some(Value::String(s)) => MessageContent::StructuredItem { text: s.clone() },
                _ => MessageContent::Unrecognized,
            },
            _ => MessageContent::Unrecognized,
        }
    }

    /// Classify a message's whole content field, which is either a list of
    /// items or a single item.
    pub fn list_from_value(value: &Value) -> Vec<Self> {
        match value {
            Value::Array(items) => items.iter().map(Self::from_value).collect(),
            Value::Null => Vec::new(),
            other => vec![Self::from_value(other)],
        }
    }

    /// Text carried by this item, if it is a recognized shape.
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::PlainText(s) => Some(s),
            MessageContent::StructuredItem { text } => Some(text),
            MessageContent::Unrecognized => None,
        }
    }
}

/// A message read back from a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<MessageContent>,
}

impl Message {
    pub fn assistant(content: Vec<MessageContent>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }
}

/// Remote document-analysis capability.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload file bytes for use by the assistant.
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<FileHandle>;

    /// Delete a previously uploaded file.
    async fn delete_file(&self, file: &FileHandle) -> Result<()>;

    /// Check that an uploaded file can be retrieved again.
    async fn verify_file_access(&self, file: &FileHandle) -> bool;

    async fn create_thread(&self) -> Result<ThreadHandle>;

    /// Post a user message, optionally attaching an uploaded file for file search.
    async fn send_message(
        &self,
        thread: &ThreadHandle,
        text: &str,
        attachment: Option<&FileHandle>,
    ) -> Result<MessageHandle>;

    async fn start_run(&self, thread: &ThreadHandle, assistant_id: &str) -> Result<RunHandle>;

    async fn get_run_status(&self, thread: &ThreadHandle, run: &RunHandle) -> Result<RunStatus>;

    /// All messages on a thread in conversation order.
    async fn list_messages(&self, thread: &ThreadHandle) -> Result<Vec<Message>>;
}
