//! Embedding interface
//!
//! The core never computes embeddings itself: it calls out to an embedding
//! service through the [`Embedder`] trait.
//! - Ollama (`/api/embeddings`, e.g. `all-minilm`)
//! - OpenAI-compatible endpoints (`/embeddings`)
//!
//! # Examples
//!
//! ```rust,no_run
//! use vedarag::config::AppConfig;
//! use vedarag::embeddings::{Embedder, EmbeddingClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = EmbeddingClient::from_config(&config)?;
//!
//!     let embedding = client.embed("What is dharma?").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod preprocess;

use async_trait::async_trait;
pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use preprocess::prepare_text_for_embedding;

use crate::errors::Result;

/// Maximum characters sent to the embedding service for one text
pub const MAX_EMBEDDING_INPUT_CHARS: usize = 2000;

/// Turns text into a fixed-dimension vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Expected vector length
    fn dimension(&self) -> usize;
}
