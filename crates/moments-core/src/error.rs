//! Error types for the scheduler library.
//!
//! Per-action failures never surface as errors: they are logged and the
//! action is skipped. [`SchedulerError`] covers what can fail
//! while loading or rendering prompt templates.

/// Errors raised while building or driving the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A prompt template failed to load or render.
    #[error("template error: {0}")]
    Template(String),
}
