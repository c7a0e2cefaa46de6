use thiserror::Error;

/// Errors surfaced by parsing and reduction. All of them are synchronous:
/// parsing stops at the first bad line, reduction at the first bad node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unknown binding: {0}")]
    UnknownBinding(String),

    #[error("unknown combinator: {0}")]
    UnknownCombinator(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("reached max step count: {0}")]
    StepLimitExceeded(usize),

    #[error("encoding error: {0}")]
    Encoding(String),
}
