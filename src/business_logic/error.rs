use thiserror::Error;

/// Failures of a single detection call. A missing pattern is not one of them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("insufficient data: need {need} samples, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid sample at index {index}: {reason}")]
    InvalidSample { index: usize, reason: &'static str },
}
