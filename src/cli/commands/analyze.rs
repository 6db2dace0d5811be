//! Batch analysis of contract documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use console::style;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use contract_analyzer::analysis::{
    AnalysisEvent, AnalysisOutcome, AnalysisRequest, DocumentAnalysisRunner, RunnerOptions,
};
use contract_analyzer::assistant::OpenAiClient;
use contract_analyzer::config::Config;

use crate::cli::icons;
use crate::cli::progress::DocumentProgress;

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// PDF files to analyze, processed one after another
    pub files: Vec<PathBuf>,
    /// Attempts per document before giving up
    #[arg(long)]
    pub max_retries: Option<u32>,
    /// Seconds between run status checks
    #[arg(long)]
    pub poll_interval: Option<u64>,
    /// Status checks per attempt before the run counts as failed (0 = no limit)
    #[arg(long)]
    pub max_polls: Option<u32>,
    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
    /// Directory to write one <name>.txt per analyzed document
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Per-document entry of the JSON report.
#[derive(Debug, Serialize)]
struct DocumentReport<'a> {
    file: String,
    success: bool,
    attempts: u32,
    answers: &'a [String],
}

impl<'a> From<&'a AnalysisOutcome> for DocumentReport<'a> {
    fn from(outcome: &'a AnalysisOutcome) -> Self {
        Self {
            file: outcome.file.display().to_string(),
            success: outcome.is_success(),
            attempts: outcome.attempts,
            answers: &outcome.answers,
        }
    }
}

/// Analyze each file in turn and print the answers grouped by file.
pub async fn cmd_analyze(config: &Config, args: AnalyzeArgs) -> anyhow::Result<()> {
    if args.files.is_empty() {
        anyhow::bail!("Please upload at least one PDF file.");
    }

    for file in &args.files {
        if !is_pdf(file) {
            eprintln!(
                "{} {} does not look like a PDF file",
                icons::warn(),
                file.display()
            );
        } else if !file.exists() {
            eprintln!("{} {} does not exist", icons::warn(), file.display());
        }
    }

    let runner_config =
        config
            .runner
            .clone()
            .with_cli_overrides(args.max_retries, args.poll_interval, args.max_polls);
    runner_config.validate()?;

    let client = OpenAiClient::from_config(&config.assistant)?;
    let options = RunnerOptions::from_config(&runner_config, config.assistant.assistant_id.clone());

    let (event_tx, event_rx) = mpsc::channel::<AnalysisEvent>(100);
    let renderer = spawn_renderer(event_rx);
    let runner = DocumentAnalysisRunner::new(Arc::new(client), options).with_events(event_tx);

    let mut outcomes = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let request = AnalysisRequest::new(file.clone(), runner_config.max_retries)?;
        outcomes.push(runner.process(&request).await);
    }

    // Dropping the runner closes the event channel so the renderer can finish
    drop(runner);
    let _ = renderer.await;
    eprintln!("{} All analyses complete!", icons::success());

    if let Some(ref dir) = args.output {
        write_outputs(dir, &outcomes).await?;
    }

    if args.json {
        let reports: Vec<DocumentReport> = outcomes.iter().map(DocumentReport::from).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_answers(&outcomes);
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        anyhow::bail!(
            "{} of {} documents could not be processed",
            failed,
            outcomes.len()
        );
    }
    Ok(())
}

/// Render runner events as spinner updates and status lines.
fn spawn_renderer(mut event_rx: mpsc::Receiver<AnalysisEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut progress: Option<DocumentProgress> = None;
        let mut max_attempts = 0;

        while let Some(event) = event_rx.recv().await {
            match event {
                AnalysisEvent::AttemptStarted {
                    file,
                    attempt,
                    max_retries,
                } => {
                    max_attempts = max_retries;
                    progress
                        .get_or_insert_with(|| DocumentProgress::start(&file))
                        .set_attempt(&file, attempt, max_retries);
                }
                AnalysisEvent::RunStarted { file, run } => {
                    if let Some(ref p) = progress {
                        p.set_message(format!("Waiting for analysis of {} ({})", file, run));
                    }
                }
                AnalysisEvent::AttemptFailed {
                    file,
                    attempt,
                    reason,
                } => {
                    status_line(
                        progress.as_ref(),
                        &format!(
                            "  {} {} {} failed: {}",
                            icons::warn(),
                            icons::attempt_tag(attempt, max_attempts),
                            file,
                            reason
                        ),
                    );
                }
                AnalysisEvent::CleanupFailed {
                    file,
                    handle,
                    error,
                } => {
                    status_line(
                        progress.as_ref(),
                        &format!(
                            "  {} Error deleting uploaded file {} for {}: {}",
                            icons::error(),
                            handle,
                            file,
                            error
                        ),
                    );
                }
                AnalysisEvent::Accepted { file, .. } => {
                    if let Some(p) = progress.take() {
                        p.finish();
                    }
                    eprintln!("{} {} successfully processed!", icons::success(), file);
                }
                AnalysisEvent::Exhausted { file, attempts } => {
                    if let Some(p) = progress.take() {
                        p.finish();
                    }
                    eprintln!(
                        "{} {} could not be processed after {} attempts.",
                        icons::error(),
                        file,
                        attempts
                    );
                }
            }
        }

        if let Some(p) = progress.take() {
            p.finish();
        }
    })
}

fn status_line(progress: Option<&DocumentProgress>, line: &str) {
    match progress {
        Some(p) => p.println(line),
        None => eprintln!("{}", line),
    }
}

fn print_answers(outcomes: &[AnalysisOutcome]) {
    let succeeded: Vec<&AnalysisOutcome> = outcomes.iter().filter(|o| o.is_success()).collect();
    if succeeded.is_empty() {
        return;
    }

    println!();
    println!("{}", style("Answers").bold().underlined());
    for outcome in succeeded {
        println!();
        println!("{}", style(format!("## {}", outcome.file.display())).bold());
        for answer in &outcome.answers {
            println!("{}", answer);
            println!();
        }
    }
}

/// Write each successful outcome to `<dir>/<file stem>.txt`.
async fn write_outputs(dir: &Path, outcomes: &[AnalysisOutcome]) -> anyhow::Result<()> {
    let dir = PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).as_ref());
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    for outcome in outcomes.iter().filter(|o| o.is_success()) {
        let path = output_path(&dir, &outcome.file);
        tokio::fs::write(&path, outcome.answers.join("\n\n"))
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("{} Wrote {}", icons::info(), path.display());
    }
    Ok(())
}

fn output_path(dir: &Path, file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    dir.join(format!("{}.txt", stem))
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
