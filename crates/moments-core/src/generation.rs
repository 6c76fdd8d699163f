//! Generation Client boundary.
//!
//! The scheduler asks an external text-generation service for post,
//! comment, and reply text through [`GenerationClient`]. The boundary is
//! thin: a persona context and an instruction go in, text or
//! an error comes out. There are no retries anywhere in this subsystem;
//! a failed or empty generation simply skips the action for this cycle.
//!
//! The trait returns a boxed future so implementations can be held as
//! `Arc<dyn GenerationClient>` and many requests can be in flight at once.

use futures::future::BoxFuture;
use moments_types::AgentId;
use tracing::{debug, warn};

/// Errors reported by a generation backend.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The backend is missing a model, credential, or endpoint.
    #[error("generation not configured: {0}")]
    NotConfigured(String),

    /// The upstream call failed or returned an unusable response.
    #[error("generation backend error: {0}")]
    Backend(String),
}

/// One generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Persona context. Always contains the agent's display name.
    pub persona: String,
    /// What to write.
    pub instruction: String,
}

/// An external text-generation service.
pub trait GenerationClient: Send + Sync {
    /// Generate text for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::NotConfigured`] when the backend lacks a
    /// model or credential, and [`GenerationError::Backend`] for upstream
    /// failures.
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<String, GenerationError>>;
}

/// Call `client` and collapse failures and blank output into `None`.
///
/// Errors and empty strings are handled identically: logged and skipped.
/// `action` names the attempted action for the log line.
pub(crate) async fn generate_text(
    client: &dyn GenerationClient,
    request: GenerationRequest,
    agent_id: AgentId,
    action: &'static str,
) -> Option<String> {
    match client.generate(request).await {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                debug!(agent_id = %agent_id, action, "generation returned empty text, skipping");
                None
            } else {
                Some(text.to_owned())
            }
        }
        Err(e) => {
            warn!(agent_id = %agent_id, action, error = %e, "generation failed, skipping");
            None
        }
    }
}
