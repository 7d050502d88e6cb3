//! Generation interface and model selection
//!
//! - [`Generator`]: opaque text-completion service (Ollama in production)
//! - [`ModelSelector`]: hardware profile to ordered candidate chain
//! - [`CandidateAvailability`]: per-session set of candidates that failed

pub mod ollama;
pub mod selector;

use async_trait::async_trait;
pub use ollama::OllamaClient;
pub use selector::CandidateAvailability;
pub use selector::ModelCandidateChain;
pub use selector::ModelSelector;

use crate::errors::CandidateFailureReason;
use crate::errors::Result;

/// Text-completion service
#[async_trait]
pub trait Generator: Send + Sync {
    /// One completion attempt with `model`; failures carry a typed reason so
    /// the caller can move on to the next candidate
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, CandidateFailureReason>;

    /// Model identifiers currently installed on the service
    async fn available_models(&self) -> Result<Vec<String>>;
}
