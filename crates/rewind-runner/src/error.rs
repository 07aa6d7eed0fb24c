//! Error types for the runner.

/// Errors the runner can produce outside the engine itself.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration loading or validation failed.
    #[error("configuration error: {0}")]
    Config(String),
}
