//! Retry-and-validate loop driving one document through the assistant.
//!
//! One attempt is: upload, verify, start a run, poll it to a terminal state,
//! extract the assistant's answers, delete the upload, validate. Any failure
//! is reported and consumes one attempt; the loop itself never errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::extract::flatten_answers;
use super::validate::{rejection_reason, Rejection};
use super::ANALYSIS_INSTRUCTION;
use crate::assistant::{
    AnalysisService, AssistantError, FileHandle, RunHandle, RunStatus, ThreadHandle,
};
use crate::config::{ConfigError, RunnerConfig};

/// A document submitted for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    file_name: PathBuf,
    max_retries: u32,
}

impl AnalysisRequest {
    pub fn new(file_name: impl Into<PathBuf>, max_retries: u32) -> Result<Self, ConfigError> {
        if max_retries == 0 {
            return Err(ConfigError::Invalid(
                "max_retries must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            file_name: file_name.into(),
            max_retries,
        })
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Settings shared by every document a runner processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    pub assistant_id: String,
    pub poll_interval: Duration,
    /// Polls per attempt before giving up on a run (0 = unbounded).
    pub max_polls: u32,
}

impl RunnerOptions {
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self::from_config(&RunnerConfig::base_default(), assistant_id)
    }

    pub fn from_config(config: &RunnerConfig, assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_polls: config.max_polls,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }
}

/// Why a single attempt did not produce an accepted answer set.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error("file upload failed: {0}")]
    Upload(String),

    #[error("uploaded file {0} could not be retrieved")]
    Verification(FileHandle),

    #[error("analysis run ended with status {0}")]
    RunEnded(RunStatus),

    #[error("analysis run still pending after {polls} polls")]
    RunTimedOut { polls: u32 },

    #[error("analysis run failed: {0}")]
    RunRequest(#[from] AssistantError),

    #[error("analysis returned insufficient results: {0}")]
    Rejected(Rejection),
}

impl AttemptFailure {
    /// Whether the failure happened while running the analysis job.
    pub fn is_run_failure(&self) -> bool {
        matches!(
            self,
            AttemptFailure::RunEnded(_)
                | AttemptFailure::RunTimedOut { .. }
                | AttemptFailure::RunRequest(_)
        )
    }
}

/// Progress events for presentation layers.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    AttemptStarted {
        file: String,
        attempt: u32,
        max_retries: u32,
    },
    RunStarted {
        file: String,
        run: RunHandle,
    },
    AttemptFailed {
        file: String,
        attempt: u32,
        reason: String,
    },
    CleanupFailed {
        file: String,
        handle: FileHandle,
        error: String,
    },
    Accepted {
        file: String,
        attempt: u32,
        answers: usize,
    },
    Exhausted {
        file: String,
        attempts: u32,
    },
}

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub file: PathBuf,
    /// Accepted answers; empty when every attempt failed.
    pub answers: Vec<String>,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        !self.answers.is_empty()
    }
}

/// Drives documents through an [`AnalysisService`] with bounded retries.
pub struct DocumentAnalysisRunner {
    service: Arc<dyn AnalysisService>,
    options: RunnerOptions,
    events: Option<mpsc::Sender<AnalysisEvent>>,
}

impl DocumentAnalysisRunner {
    pub fn new(service: Arc<dyn AnalysisService>, options: RunnerOptions) -> Self {
        Self {
            service,
            options,
            events: None,
        }
    }

    /// Report progress on `tx`. Send failures (receiver gone) are ignored.
    pub fn with_events(mut self, tx: mpsc::Sender<AnalysisEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub async fn process(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        self.process_with_retries(request.file_name(), request.max_retries())
            .await
    }

    /// Analyze `file_name`, retrying up to `max_retries` attempts.
    ///
    /// Returns the first accepted answer set, or an empty one once all
    /// attempts are used.
    pub async fn process_with_retries(&self, file_name: &Path, max_retries: u32) -> AnalysisOutcome {
        let label = file_name.display().to_string();
        let mut attempts = 0;

        while attempts < max_retries {
            attempts += 1;
            info!(file = %label, attempt = attempts, max_retries, "Processing document");
            self.emit(AnalysisEvent::AttemptStarted {
                file: label.clone(),
                attempt: attempts,
                max_retries,
            })
            .await;

            match self.attempt(file_name, &label).await {
                Ok(answers) => {
                    info!(
                        file = %label,
                        attempt = attempts,
                        answers = answers.len(),
                        "Analysis accepted"
                    );
                    self.emit(AnalysisEvent::Accepted {
                        file: label.clone(),
                        attempt: attempts,
                        answers: answers.len(),
                    })
                    .await;
                    return AnalysisOutcome {
                        file: file_name.to_path_buf(),
                        answers,
                        attempts,
                    };
                }
                Err(failure) => {
                    warn!(file = %label, attempt = attempts, "Attempt failed: {}", failure);
                    self.emit(AnalysisEvent::AttemptFailed {
                        file: label.clone(),
                        attempt: attempts,
                        reason: failure.to_string(),
                    })
                    .await;
                }
            }
        }

        error!(file = %label, attempts, "Failed to process document after all attempts");
        self.emit(AnalysisEvent::Exhausted {
            file: label,
            attempts,
        })
        .await;

        AnalysisOutcome {
            file: file_name.to_path_buf(),
            answers: Vec::new(),
            attempts,
        }
    }

    async fn attempt(&self, file_name: &Path, label: &str) -> Result<Vec<String>, AttemptFailure> {
        let handle = self.upload(file_name).await?;

        let result = self.analyze_uploaded(&handle, label).await;
        // The upload is released whatever happened to the run
        self.cleanup(&handle, label).await;

        let answers = result?;
        if let Some(rejection) = rejection_reason(&answers) {
            return Err(AttemptFailure::Rejected(rejection));
        }
        Ok(answers)
    }

    async fn upload(&self, file_name: &Path) -> Result<FileHandle, AttemptFailure> {
        let bytes = tokio::fs::read(file_name)
            .await
            .map_err(|e| AttemptFailure::Upload(format!("{}: {}", file_name.display(), e)))?;
        let remote_name = file_name
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        self.service
            .upload_file(&remote_name, bytes)
            .await
            .map_err(|e| AttemptFailure::Upload(e.to_string()))
    }

    async fn analyze_uploaded(
        &self,
        handle: &FileHandle,
        label: &str,
    ) -> Result<Vec<String>, AttemptFailure> {
        if !self.service.verify_file_access(handle).await {
            return Err(AttemptFailure::Verification(handle.clone()));
        }

        let thread = self.service.create_thread().await?;
        self.service
            .send_message(&thread, ANALYSIS_INSTRUCTION, Some(handle))
            .await?;
        let run = self
            .service
            .start_run(&thread, &self.options.assistant_id)
            .await?;
        debug!(file = label, thread = %thread, run = %run, "Run started");
        self.emit(AnalysisEvent::RunStarted {
            file: label.to_string(),
            run: run.clone(),
        })
        .await;

        self.wait_for_run(&thread, &run).await?;

        let messages = self.service.list_messages(&thread).await?;
        Ok(flatten_answers(&messages))
    }

    /// Poll until the run completes, fails, or exceeds the poll bound.
    async fn wait_for_run(&self, thread: &ThreadHandle, run: &RunHandle) -> Result<(), AttemptFailure> {
        let mut polls = 0;
        loop {
            let status = self.service.get_run_status(thread, run).await?;
            polls += 1;

            match status {
                RunStatus::Completed => return Ok(()),
                RunStatus::Failed | RunStatus::Cancelled => {
                    return Err(AttemptFailure::RunEnded(status));
                }
                RunStatus::Pending => {}
            }

            if self.options.max_polls > 0 && polls >= self.options.max_polls {
                return Err(AttemptFailure::RunTimedOut { polls });
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    async fn cleanup(&self, handle: &FileHandle, label: &str) {
        if let Err(e) = self.service.delete_file(handle).await {
            warn!(file = label, file_id = %handle, "Error deleting file: {}", e);
            self.emit(AnalysisEvent::CleanupFailed {
                file: label.to_string(),
                handle: handle.clone(),
                error: e.to_string(),
            })
            .await;
        }
    }

    async fn emit(&self, event: AnalysisEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_zero_retries() {
        assert!(AnalysisRequest::new("contract.pdf", 0).is_err());

        let request = AnalysisRequest::new("contract.pdf", 3).unwrap();
        assert_eq!(request.file_name(), Path::new("contract.pdf"));
        assert_eq!(request.max_retries(), 3);
    }

    #[test]
    fn test_options_from_config() {
        let config = RunnerConfig::base_default().with_cli_overrides(None, Some(2), Some(10));
        let options = RunnerOptions::from_config(&config, "asst_1");
        assert_eq!(options.assistant_id, "asst_1");
        assert_eq!(options.poll_interval, Duration::from_secs(2));
        assert_eq!(options.max_polls, 10);
    }

    #[test]
    fn test_run_failure_classification() {
        assert!(AttemptFailure::RunEnded(RunStatus::Cancelled).is_run_failure());
        assert!(AttemptFailure::RunTimedOut { polls: 3 }.is_run_failure());
        assert!(!AttemptFailure::Upload("disk".to_string()).is_run_failure());
        assert!(!AttemptFailure::Rejected(Rejection::Empty).is_run_failure());
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            AttemptFailure::RunEnded(RunStatus::Failed).to_string(),
            "analysis run ended with status failed"
        );
        assert_eq!(
            AttemptFailure::Rejected(Rejection::TooShort).to_string(),
            "analysis returned insufficient results: no answer longer than 10 characters"
        );
    }
}
