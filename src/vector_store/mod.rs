//! Vector store query interface
//!
//! The store is populated by a separate ingestion pipeline; this crate only
//! reads from it. [`WeaviateStore`] talks to Weaviate over GraphQL.

pub mod weaviate;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
pub use weaviate::WeaviateStore;

use crate::errors::Result;

/// Raw record returned by a store query, before blending and filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub content: String,
    pub source: String,
    pub page: i64,
    /// Label assigned at ingestion, if the record carries one
    pub category: Option<String>,
    /// Store-side relevance, expected in [0, 1]
    pub relevance: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Nearest records to `embedding`; `keywords` lets the store fall back to
    /// keyword search when the vector query finds nothing
    async fn query(
        &self,
        embedding: &[f32],
        keywords: Option<&str>,
        top_n: usize,
    ) -> Result<Vec<CandidateRecord>>;

    /// Stored record counts keyed by raw category label
    async fn count_by_category(&self) -> Result<Vec<(String, u64)>>;

    /// Cheap reachability check
    async fn health(&self) -> Result<()>;
}
