//! Heuristic check that an assistant answer is a real analysis.
//!
//! The assistant sometimes reports that it could not read the document as a
//! normal completed answer. Those replies are caught by phrase matching; this
//! is a textual heuristic and can misjudge unusual answers.

/// Phrases that mark an answer as a disguised failure. Matched case-insensitively.
pub const INVALID_PHRASES: &[&str] = &[
    "unable to access the contents of the PDF",
    "re-upload the file",
    "did not yield any results",
    "manually analyze the document",
    "does not contain any text that can be searched",
    "any searchable text",
    "try uploading it again",
    "issue retrieving the content",
    "unable to access the content of the PDF",
    "unable to access the content",
    "issue retrieving content",
];

/// An answer set is accepted only if some answer is longer than this
/// (in characters, after trimming).
pub const MIN_ANSWER_CHARS: usize = 10;

/// Why an answer set was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No answers at all.
    Empty,
    /// An answer contains a failure phrase.
    Denylisted { phrase: &'static str },
    /// Every answer is too short to be an analysis.
    TooShort,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Empty => write!(f, "no answers returned"),
            Rejection::Denylisted { phrase } => {
                write!(f, "answer reports a failure (\"{}\")", phrase)
            }
            Rejection::TooShort => write!(
                f,
                "no answer longer than {} characters",
                MIN_ANSWER_CHARS
            ),
        }
    }
}

/// Find the reason an answer set should be rejected, if any.
pub fn rejection_reason<S: AsRef<str>>(answers: &[S]) -> Option<Rejection> {
    if answers.is_empty() {
        return Some(Rejection::Empty);
    }

    for answer in answers {
        let lowered = answer.as_ref().to_lowercase();
        if let Some(phrase) = INVALID_PHRASES
            .iter()
            .find(|phrase| lowered.contains(&phrase.to_lowercase()))
        {
            return Some(Rejection::Denylisted { phrase: *phrase });
        }
    }

    let any_substantial = answers
        .iter()
        .any(|answer| answer.as_ref().trim().chars().count() > MIN_ANSWER_CHARS);
    if any_substantial {
        None
    } else {
        Some(Rejection::TooShort)
    }
}

/// Whether the answers look like a genuine analysis.
pub fn is_valid_summary<S: AsRef<str>>(answers: &[S]) -> bool {
    rejection_reason(answers).is_none()
}
