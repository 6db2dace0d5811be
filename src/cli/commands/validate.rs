//! Offline check of saved answers.

use std::path::Path;

use anyhow::Context;
use tokio::io::AsyncReadExt;

use contract_analyzer::analysis::rejection_reason;

use crate::cli::icons;

pub async fn cmd_validate(file: Option<&Path>) -> anyhow::Result<()> {
    let text = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read answers from stdin")?;
            buf
        }
    };

    let answers = split_answers(&text);
    match rejection_reason(&answers) {
        None => {
            println!("{} {} answer(s) accepted", icons::success(), answers.len());
            Ok(())
        }
        Some(reason) => {
            println!("{} Rejected: {}", icons::error(), reason);
            anyhow::bail!("answers did not pass validation")
        }
    }
}

/// Split text into answers on blank lines.
fn split_answers(text: &str) -> Vec<String> {
    let mut answers = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                answers.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        answers.push(current.join("\n"));
    }
    answers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_answers() {
        let text = "Parties: A and B.\nTerm: 2 years.\n\n\n  \nNotice period: 3 months.\n";
        assert_eq!(
            split_answers(text),
            vec![
                "Parties: A and B.\nTerm: 2 years.".to_string(),
                "Notice period: 3 months.".to_string(),
            ]
        );
        assert!(split_answers("\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_validate_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, "The lease runs for 24 months from signing.").unwrap();
        assert!(cmd_validate(Some(&good)).await.is_ok());

        let bad = dir.path().join("bad.txt");
        std::fs::write(&bad, "Please re-upload the file so I can read it.").unwrap();
        assert!(cmd_validate(Some(&bad)).await.is_err());
    }
}
