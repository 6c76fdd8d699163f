//! Error types for the runner binary.
//!
//! Only start-up failures surface here. Generation failures at run time are
//! reported to the scheduler as [`GenerationError`] and skipped there.
//!
//! [`GenerationError`]: moments_core::generation::GenerationError

/// Errors that can occur while starting the runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// An environment variable is present but invalid.
    #[error("config error: {0}")]
    Config(String),

    /// The HTTP client for a generation backend could not be built.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),
}
