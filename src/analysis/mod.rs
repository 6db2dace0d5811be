//! Document analysis: the retry loop, answer extraction and validation.

pub mod extract;
pub mod runner;
pub mod validate;

pub use extract::flatten_answers;
pub use runner::{
    AnalysisEvent, AnalysisOutcome, AnalysisRequest, AttemptFailure, DocumentAnalysisRunner,
    RunnerOptions,
};
pub use validate::{is_valid_summary, rejection_reason, Rejection, INVALID_PHRASES};

/// Instruction sent with every analysis request.
pub const ANALYSIS_INSTRUCTION: &str = "Analyze the PDF following your instructions. Analyze the whole document. Execute your whole task.";
