//! Complete RAG pipeline: Score -> Retrieve -> Assemble -> Generate

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::info_span;
use tracing::warn;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::embeddings::EmbeddingClient;
use crate::errors::CandidateFailure;
use crate::errors::CandidateFailureReason;
use crate::errors::Result;
use crate::errors::VedaRagError;
use crate::llm::CandidateAvailability;
use crate::llm::Generator;
use crate::llm::ModelCandidateChain;
use crate::llm::ModelSelector;
use crate::llm::OllamaClient;
use crate::models::Answer;
use crate::models::AnswerMode;
use crate::models::AnswerRequest;
use crate::models::CategoryCount;
use crate::models::HardwareProfile;
use crate::models::MAX_SOURCES;
use crate::rag::ComplexityScorer;
use crate::rag::ContextAssembler;
use crate::rag::GenerationPrompt;
use crate::rag::HybridRetriever;
use crate::rag::RetrieverSettings;
use crate::taxonomy::Category;
use crate::taxonomy::Taxonomy;
use crate::vector_store::VectorStore;
use crate::vector_store::WeaviateStore;

/// Per-call pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Scoring,
    Retrieving,
    Assembling,
    Generating,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scoring => "scoring",
            Self::Retrieving => "retrieving",
            Self::Assembling => "assembling",
            Self::Generating => "generating",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Stored passage counts per category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryReport {
    pub counts: Vec<CategoryCount>,
    pub total: u64,
}

/// Reachability of the external services for one hardware profile
#[derive(Debug, Clone)]
pub struct ServiceHealth {
    pub vector_store: std::result::Result<(), String>,
    pub generation: std::result::Result<(), String>,
    pub installed_models: Vec<String>,
    pub chain: ModelCandidateChain,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.vector_store.is_ok() && self.generation.is_ok()
    }

    /// Chain candidates not installed on the generation service
    pub fn missing_candidates(&self) -> Vec<&str> {
        self.chain
            .iter()
            .filter(|model| !self.installed_models.iter().any(|m| m == model))
            .collect()
    }
}

/// Complete RAG service
///
/// Holds no per-query state. The only mutable state is the set of model
/// candidates marked unavailable during this instance's lifetime.
pub struct RagService {
    scorer: ComplexityScorer,
    retriever: HybridRetriever,
    context_assembler: ContextAssembler,
    selector: ModelSelector,
    availability: CandidateAvailability,
    generator: Arc<dyn Generator>,
    store: Arc<dyn VectorStore>,
    taxonomy: Taxonomy,
    generation_timeout: Duration,
}

impl RagService {
    /// Create a new RAG service backed by Weaviate and Ollama
    ///
    /// # Errors
    /// - HTTP client construction errors
    pub fn new(config: &AppConfig) -> Result<Self> {
        let embedder = Arc::new(EmbeddingClient::from_config(config)?);
        let store = Arc::new(WeaviateStore::from_config(config)?);
        let generator = Arc::new(OllamaClient::from_config(config)?);
        Ok(Self::from_services(config, embedder, store, generator))
    }

    /// Create from existing services
    #[must_use]
    pub fn from_services(
        config: &AppConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let taxonomy = Taxonomy::default();
        let retriever = HybridRetriever::new(
            embedder,
            Arc::clone(&store),
            taxonomy.clone(),
            RetrieverSettings::from_config(config),
        );

        Self {
            scorer: ComplexityScorer::new(),
            retriever,
            context_assembler: ContextAssembler::from_config(config),
            selector: ModelSelector::from_config(config),
            availability: CandidateAvailability::new(),
            generator,
            store,
            taxonomy,
            generation_timeout: config.generation_timeout(),
        }
    }

    /// Answer a question, optionally with an explicit source count
    ///
    /// # Errors
    /// - `InvalidRequest` for an empty question or `override_k` outside 1..=15
    /// - `RetrievalUnavailable` when the embedding service or vector store fails
    /// - `GenerationExhausted` when every model candidate fails
    pub async fn answer(
        &self,
        query_text: &str,
        hardware_profile: HardwareProfile,
        override_k: Option<usize>,
    ) -> Result<Answer> {
        let request = AnswerRequest::new(query_text, hardware_profile).with_sources(override_k);
        self.answer_with_cancel(&request, &CancellationToken::new())
            .await
    }

    /// Like [`answer`](Self::answer); cancelling `cancel` abandons the
    /// in-flight external call and returns `Cancelled`
    pub async fn answer_with_cancel(
        &self,
        request: &AnswerRequest,
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        validate_request(request)?;

        let query_id = Uuid::new_v4();
        let span = info_span!(
            "answer",
            query_id = %query_id,
            profile = %request.hardware_profile
        );

        self.run_pipeline(query_id, request, cancel)
            .instrument(span)
            .await
    }

    async fn run_pipeline(
        &self,
        query_id: Uuid,
        request: &AnswerRequest,
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        info!("Processing RAG query: {}", request.question);

        // Step 1: Score complexity
        let query = self
            .scorer
            .score_with_override(&request.question, request.override_k);
        debug!(
            stage = %PipelineStage::Scoring,
            "Complexity {} -> {} sources",
            query.complexity_class,
            query.target_k
        );

        // Step 2: Retrieve relevant passages
        let retrieved = cancellable(
            cancel,
            PipelineStage::Retrieving,
            self.retriever.retrieve(&query.text, query.target_k),
        )
        .await??;
        debug!(stage = %PipelineStage::Retrieving, "Retrieved {} passages", retrieved.len());

        // Step 3: Assemble context
        let context = self.context_assembler.assemble(&retrieved);
        debug!(
            stage = %PipelineStage::Assembling,
            "Context: {} chars, {} passages, {} dropped for budget",
            context.char_len(),
            context.included,
            context.dropped
        );

        // Step 4: Generate through the fallback chain
        let prompt = GenerationPrompt::build(&query.text, &context);
        if prompt.general_knowledge {
            if context.dropped == 0 {
                info!("No relevant passages found, answering from general knowledge");
            } else {
                info!(
                    "All {} retrieved passages exceed the {} char context budget, answering from general knowledge",
                    context.dropped,
                    self.context_assembler.max_chars()
                );
            }
        }
        let chain = self.selector.resolve_chain(request.hardware_profile);
        let (model, text) = self.generate(&chain, &prompt, cancel).await?;

        let (mode, sources) = if prompt.general_knowledge {
            (AnswerMode::GeneralKnowledge, Vec::new())
        } else {
            (AnswerMode::Grounded, context.sources)
        };

        info!(
            stage = %PipelineStage::Done,
            "RAG query completed with {} using {} sources",
            model,
            sources.len()
        );

        Ok(Answer {
            query_id,
            text,
            sources,
            mode,
            model,
            complexity_class: query.complexity_class,
            target_k: query.target_k,
            generated_at: Utc::now(),
        })
    }

    /// Walk the chain once; each failure marks its candidate unavailable
    async fn generate(
        &self,
        chain: &ModelCandidateChain,
        prompt: &GenerationPrompt,
        cancel: &CancellationToken,
    ) -> Result<(String, String)> {
        let mut attempts = Vec::with_capacity(chain.len());

        for model in chain.iter() {
            if !self.availability.is_available(model) {
                debug!("Skipping {}, marked unavailable this session", model);
                attempts.push(CandidateFailure {
                    model: model.to_string(),
                    reason: CandidateFailureReason::PreviouslyUnavailable,
                });
                continue;
            }

            info!("Using model: {}", model);
            let call = tokio::time::timeout(
                self.generation_timeout,
                self.generator.generate(model, &prompt.text),
            );

            let reason = match cancellable(cancel, PipelineStage::Generating, call).await? {
                Ok(Ok(text)) => return Ok((model.to_string(), text)),
                Ok(Err(reason)) => reason,
                Err(_) => CandidateFailureReason::Timeout,
            };

            warn!("Model {} failed ({}), trying next candidate", model, reason);
            self.availability.mark_unavailable(model);
            attempts.push(CandidateFailure {
                model: model.to_string(),
                reason,
            });
        }

        Err(VedaRagError::GenerationExhausted { attempts })
    }

    /// Resolved chain for a profile
    pub fn candidate_chain(&self, profile: HardwareProfile) -> ModelCandidateChain {
        self.selector.resolve_chain(profile)
    }

    /// Models marked unavailable so far, sorted
    pub fn unavailable_candidates(&self) -> Vec<String> {
        self.availability.unavailable()
    }

    /// Give every candidate another chance
    pub fn reset_unavailable(&self) {
        self.availability.reset();
        info!("Cleared unavailable model candidates");
    }

    /// Stored passage counts per category, largest first
    ///
    /// # Errors
    /// - `RetrievalUnavailable` when the store cannot be queried
    pub async fn category_counts(&self) -> Result<CategoryReport> {
        let raw = self
            .store
            .count_by_category()
            .await
            .map_err(|e| VedaRagError::RetrievalUnavailable(e.to_string()))?;

        let mut merged: BTreeMap<Category, u64> = BTreeMap::new();
        for (label, count) in raw {
            let category = self.taxonomy.resolve(Some(label.as_str()), &label);
            *merged.entry(category).or_default() += count;
        }

        let mut counts: Vec<CategoryCount> = merged
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        counts.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.category.label().cmp(b.category.label()))
        });
        let total = counts.iter().map(|c| c.count).sum();

        Ok(CategoryReport { counts, total })
    }

    /// Probe both services concurrently
    pub async fn health(&self, profile: HardwareProfile) -> ServiceHealth {
        let (store, models) =
            futures::join!(self.store.health(), self.generator.available_models());

        let (generation, installed_models) = match models {
            Ok(models) => (Ok(()), models),
            Err(e) => (Err(e.to_string()), Vec::new()),
        };

        ServiceHealth {
            vector_store: store.map_err(|e| e.to_string()),
            generation,
            installed_models,
            chain: self.candidate_chain(profile),
        }
    }
}

fn validate_request(request: &AnswerRequest) -> Result<()> {
    if request.question.trim().is_empty() {
        return Err(VedaRagError::InvalidRequest(
            "query text must not be empty".to_string(),
        ));
    }
    if let Some(k) = request.override_k {
        if !(1..=MAX_SOURCES).contains(&k) {
            return Err(VedaRagError::InvalidRequest(format!(
                "requested source count {k} is outside 1..={MAX_SOURCES}"
            )));
        }
    }
    Ok(())
}

/// Race `call` against cancellation
async fn cancellable<T>(
    cancel: &CancellationToken,
    stage: PipelineStage,
    call: impl Future<Output = T>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            info!("Query cancelled while {}", stage);
            Err(VedaRagError::Cancelled { stage })
        }
        value = call => Ok(value),
    }
}
