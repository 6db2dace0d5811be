//! OpenAI Assistants (v2) implementation of [`AnalysisService`].
//!
//! Files are uploaded with `purpose=assistants` and attached to the
//! instruction message through the `file_search` tool.

mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{
    AnalysisService, AssistantError, FileHandle, Message, MessageContent, MessageHandle, Result,
    Role, RunHandle, RunStatus, ThreadHandle,
};
use crate::config::AssistantConfig;
use types::{
    Attachment, AttachmentTool, CreateMessageRequest, CreateRunRequest, CreatedObject,
    DeletedObject, ErrorEnvelope, MessageList, RunObject,
};

/// Page size used when listing thread messages.
const MESSAGE_PAGE_LIMIT: &str = "100";

/// Pages fetched per listing before giving up on the cursor.
const MAX_MESSAGE_PAGES: usize = 50;

/// HTTP client for the hosted assistant API.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiClient {
    /// Create a client against `endpoint` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Create a client from configuration. Fails when no API key is set.
    pub fn from_config(config: &AssistantConfig) -> anyhow::Result<Self> {
        let api_key = config.api_key()?;
        Ok(Self::new(
            config.endpoint.clone(),
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )?)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.endpoint, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = check_status(request.send().await?).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Turn a non-2xx response into `AssistantError::Api`, preferring the
/// service's own error message over the raw body.
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);

    Err(AssistantError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AnalysisService for OpenAiClient {
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<FileHandle> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.essence_str())?;
        let form = Form::new().text("purpose", "assistants").part("file", part);

        let created: CreatedObject = self
            .execute(self.request(Method::POST, "/files").multipart(form))
            .await?;
        debug!(file_id = %created.id, file_name, size, "Uploaded file");
        Ok(FileHandle::new(created.id))
    }

    async fn delete_file(&self, file: &FileHandle) -> Result<()> {
        let deleted: DeletedObject = self
            .execute(self.request(Method::DELETE, &format!("/files/{}", file)))
            .await?;
        if !deleted.deleted {
            return Err(AssistantError::Api {
                status: 200,
                message: format!("service refused to delete {}", file),
            });
        }
        debug!(file_id = %file, "Deleted file");
        Ok(())
    }

    async fn verify_file_access(&self, file: &FileHandle) -> bool {
        let result: Result<CreatedObject> = self
            .execute(self.request(Method::GET, &format!("/files/{}", file)))
            .await;
        match result {
            Ok(found) => found.id == file.as_str(),
            Err(e) if e.is_not_found() => {
                warn!(file_id = %file, "Uploaded file not found on the service");
                false
            }
            Err(e) => {
                warn!(file_id = %file, "File verification failed: {}", e);
                false
            }
        }
    }

    async fn create_thread(&self) -> Result<ThreadHandle> {
        let created: CreatedObject = self
            .execute(
                self.request(Method::POST, "/threads")
                    .json(&serde_json::json!({})),
            )
            .await?;
        Ok(ThreadHandle::new(created.id))
    }

    async fn send_message(
        &self,
        thread: &ThreadHandle,
        text: &str,
        attachment: Option<&FileHandle>,
    ) -> Result<MessageHandle> {
        let attachments = attachment
            .map(|file| {
                vec![Attachment {
                    file_id: file.as_str(),
                    tools: vec![AttachmentTool::file_search()],
                }]
            })
            .unwrap_or_default();
        let body = CreateMessageRequest {
            role: "user",
            content: text,
            attachments,
        };

        let created: CreatedObject = self
            .execute(
                self.request(Method::POST, &format!("/threads/{}/messages", thread))
                    .json(&body),
            )
            .await?;
        Ok(MessageHandle::new(created.id))
    }

    async fn start_run(&self, thread: &ThreadHandle, assistant_id: &str) -> Result<RunHandle> {
        let created: CreatedObject = self
            .execute(
                self.request(Method::POST, &format!("/threads/{}/runs", thread))
                    .json(&CreateRunRequest { assistant_id }),
            )
            .await?;
        Ok(RunHandle::new(created.id))
    }

    async fn get_run_status(&self, thread: &ThreadHandle, run: &RunHandle) -> Result<RunStatus> {
        let run_object: RunObject = self
            .execute(self.request(Method::GET, &format!("/threads/{}/runs/{}", thread, run)))
            .await?;

        let status = RunStatus::from_api(&run_object.status);
        if let Some(err) = run_object.last_error.as_ref().filter(|_| status.is_terminal()) {
            warn!(
                run_id = %run,
                status = %run_object.status,
                code = err.code.as_deref().unwrap_or("unknown"),
                "Run error: {}",
                err.message.as_deref().unwrap_or("no details")
            );
        } else {
            debug!(run_id = %run, status = %run_object.status, "Polled run");
        }
        Ok(status)
    }

    async fn list_messages(&self, thread: &ThreadHandle) -> Result<Vec<Message>> {
        let path = format!("/threads/{}/messages", thread);
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        for _ in 0..MAX_MESSAGE_PAGES {
            let mut request = self
                .request(Method::GET, &path)
                .query(&[("order", "asc"), ("limit", MESSAGE_PAGE_LIMIT)]);
            if let Some(ref cursor) = after {
                request = request.query(&[("after", cursor.as_str())]);
            }

            let page: MessageList = self.execute(request).await?;
            // A page ending at the cursor we asked from repeats the last one
            if after.is_some() && page.last_id == after {
                warn!(thread_id = %thread, "Message cursor did not advance, stopping");
                return Ok(messages);
            }
            messages.extend(page.data.into_iter().map(|m| Message {
                role: Role::from_api(&m.role),
                content: MessageContent::list_from_value(&m.content),
            }));

            match (page.has_more, page.last_id) {
                (true, Some(last_id)) => after = Some(last_id),
                _ => return Ok(messages),
            }
        }

        warn!(
            thread_id = %thread,
            pages = MAX_MESSAGE_PAGES,
            "Message listing hit the page limit"
        );
        Ok(messages)
    }
}
