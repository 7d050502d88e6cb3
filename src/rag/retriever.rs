//! Hybrid retrieval: vector similarity blended with keyword overlap

use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::errors::VedaRagError;
use crate::models::Passage;
use crate::rag::terms::keyword_overlap;
use crate::rag::terms::keyword_terms;
use crate::taxonomy::Taxonomy;
use crate::vector_store::CandidateRecord;
use crate::vector_store::VectorStore;

/// Tunables for one retriever
#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    pub similarity_floor: f32,
    pub keyword_weight: f32,
    pub candidate_multiplier: usize,
    pub embedding_timeout: Duration,
    pub search_timeout: Duration,
}

impl RetrieverSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            similarity_floor: config.retrieval.similarity_floor,
            keyword_weight: config.retrieval.keyword_weight,
            candidate_multiplier: config.retrieval.candidate_multiplier.max(1),
            embedding_timeout: config.embedding_timeout(),
            search_timeout: config.vector_search_timeout(),
        }
    }
}

/// Passages for one query, sorted by descending score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub passages: Vec<Passage>,
    /// Records the store returned before filtering
    pub candidates: usize,
    /// Records dropped by the similarity floor
    pub below_floor: usize,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Passage> {
        self.passages.iter()
    }
}

/// Weighted blend of the vector and keyword signals
pub fn blend_score(vector: f32, keyword: f32, keyword_weight: f32) -> f32 {
    let vector = if vector.is_nan() { 0.0 } else { vector.clamp(0.0, 1.0) };
    (1.0 - keyword_weight).mul_add(vector, keyword_weight * keyword)
}

/// Descending score, then source name, then page
pub fn compare_passages(a: &Passage, b: &Passage) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.page.cmp(&b.page))
}

/// Retriever combining an embedding service and a vector store
pub struct HybridRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    taxonomy: Taxonomy,
    settings: RetrieverSettings,
}

impl HybridRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        taxonomy: Taxonomy,
        settings: RetrieverSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            taxonomy,
            settings,
        }
    }

    /// Retrieve at most `target_k` passages scoring at or above the floor
    ///
    /// # Errors
    /// - `RetrievalUnavailable` when the embedding service or the store fails
    ///   or times out. An empty result is not an error.
    pub async fn retrieve(&self, query_text: &str, target_k: usize) -> Result<RetrievalResult> {
        if target_k == 0 {
            return Ok(RetrievalResult::default());
        }

        let embedding = bounded(
            self.settings.embedding_timeout,
            "embedding",
            self.embedder.embed(query_text),
        )
        .await?;

        let top_n = target_k.saturating_mul(self.settings.candidate_multiplier);
        debug!("Searching for {} candidates (will filter to {})", top_n, target_k);

        let records = bounded(
            self.settings.search_timeout,
            "vector search",
            self.store.query(&embedding, Some(query_text), top_n),
        )
        .await?;

        Ok(self.rank(query_text, records, target_k))
    }

    /// Blend, filter by floor, sort, truncate. Pure, no I/O.
    pub fn rank(
        &self,
        query_text: &str,
        records: Vec<CandidateRecord>,
        target_k: usize,
    ) -> RetrievalResult {
        let terms = keyword_terms(query_text);
        // Without usable terms the keyword signal carries no information
        let weight = if terms.is_empty() {
            0.0
        } else {
            self.settings.keyword_weight
        };

        let candidates = records.len();
        let mut below_floor = 0;
        let mut passages = Vec::with_capacity(candidates);

        for record in records {
            if record.content.trim().is_empty() {
                debug!("Skipping empty record from {} page {}", record.source, record.page);
                continue;
            }

            let keyword = keyword_overlap(&terms, &record.content);
            let score = blend_score(record.relevance, keyword, weight);
            if score < self.settings.similarity_floor {
                below_floor += 1;
                continue;
            }

            passages.push(Passage {
                category: self
                    .taxonomy
                    .resolve(record.category.as_deref(), &record.source),
                page: u32::try_from(record.page).unwrap_or(0),
                content: record.content,
                source: record.source,
                score,
            });
        }

        passages.sort_by(compare_passages);
        passages.truncate(target_k);

        debug!(
            "Kept {} of {} candidates ({} below floor {})",
            passages.len(),
            candidates,
            below_floor,
            self.settings.similarity_floor
        );

        RetrievalResult {
            passages,
            candidates,
            below_floor,
        }
    }
}

/// Bound an external call; every failure becomes `RetrievalUnavailable`
async fn bounded<T>(
    limit: Duration,
    what: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(VedaRagError::RetrievalUnavailable(format!("{what} failed: {e}"))),
        Err(_) => Err(VedaRagError::RetrievalUnavailable(format!(
            "{what} timed out after {limit:?}"
        ))),
    }
}
