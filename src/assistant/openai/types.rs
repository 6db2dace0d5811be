//! Wire types for the OpenAI files and assistants endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Any created object; only the id is needed.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreatedObject {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeletedObject {
    #[allow(dead_code)]
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateMessageRequest<'a> {
    pub role: &'static str,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Attachment<'a> {
    pub file_id: &'a str,
    pub tools: Vec<AttachmentTool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttachmentTool {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
}

impl AttachmentTool {
    pub fn file_search() -> Self {
        Self {
            tool_type: "file_search",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunObject {
    #[allow(dead_code)]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageList {
    pub data: Vec<MessageObject>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageObject {
    pub role: String,
    /// Kept raw: items come in several shapes and are classified later.
    #[serde(default)]
    pub content: Value,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}
