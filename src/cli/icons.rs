//! Status markers for analysis output.

use console::{style, StyledObject};

/// Document accepted.
pub fn success() -> StyledObject<&'static str> {
    style("✓").green()
}

pub fn info() -> StyledObject<&'static str> {
    style("→").cyan()
}

/// Attempt failed but may be retried.
pub fn warn() -> StyledObject<&'static str> {
    style("!").yellow()
}

/// Document gave up on, or cleanup failed.
pub fn error() -> StyledObject<&'static str> {
    style("✗").red()
}

/// Dimmed `[attempt/max]` tag for per-attempt status lines.
pub fn attempt_tag(attempt: u32, max_retries: u32) -> StyledObject<String> {
    style(format!("[{}/{}]", attempt, max_retries)).dim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_tag_text() {
        let tag = attempt_tag(2, 3).force_styling(false);
        assert_eq!(tag.to_string(), "[2/3]");
    }
}
