//! Spinner display for per-document analysis progress.
//!
//! Status lines go to stderr through the spinner so they do not tear the
//! display; answers are printed to stdout separately.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while one document is being analyzed.
pub struct DocumentProgress {
    bar: ProgressBar,
}

impl DocumentProgress {
    /// Start a spinner for `file`.
    pub fn start(file: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {wide_msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("Processing {}...", truncate_filename(file, 40)));
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn set_attempt(&self, file: &str, attempt: u32, max_retries: u32) {
        self.bar.set_message(format!(
            "Processing {}, attempt {}/{}...",
            truncate_filename(file, 40),
            attempt,
            max_retries
        ));
    }

    pub fn set_message(&self, message: String) {
        self.bar.set_message(message);
    }

    /// Print a line to stderr without corrupting the spinner.
    pub fn println(&self, line: &str) {
        self.bar.suspend(|| eprintln!("{}", line));
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

/// Truncate a filename for display, keeping the extension visible.
pub fn truncate_filename(name: &str, max_len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_len {
        return name.to_string();
    }

    // Try to keep the extension
    if let Some(dot_pos) = chars.iter().rposition(|&c| c == '.') {
        let ext_len = chars.len() - dot_pos;
        if ext_len + 4 < max_len {
            let prefix: String = chars[..max_len - ext_len - 3].iter().collect();
            let ext: String = chars[dot_pos..].iter().collect();
            return format!("{}...{}", prefix, ext);
        }
    }

    let prefix: String = chars[..max_len.saturating_sub(3)].iter().collect();
    format!("{}...", prefix)
}
