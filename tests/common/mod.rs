//! In-memory doubles for the external services

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vedarag::config::AppConfig;
use vedarag::embeddings::Embedder;
use vedarag::errors::CandidateFailureReason;
use vedarag::llm::Generator;
use vedarag::rag::RagService;
use vedarag::vector_store::CandidateRecord;
use vedarag::vector_store::VectorStore;
use vedarag::Result;
use vedarag::VedaRagError;

/// Returns the same vector for every text, or fails every call; counts calls
#[derive(Default)]
pub struct FixedEmbedder {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl FixedEmbedder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VedaRagError::EmbeddingError("embedding service down".to_string()));
        }
        Ok(vec![0.1, 0.2, 0.3, 0.4])
    }

    fn dimension(&self) -> usize {
        4
    }
}

/// Serves a fixed record set, or fails every call
#[derive(Default)]
pub struct ScriptedStore {
    pub records: Vec<CandidateRecord>,
    pub counts: Vec<(String, u64)>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub requested: Mutex<Vec<usize>>,
}

impl ScriptedStore {
    pub fn with_records(records: Vec<CandidateRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

#[async_trait]
impl VectorStore for ScriptedStore {
    async fn query(
        &self,
        _embedding: &[f32],
        _keywords: Option<&str>,
        top_n: usize,
    ) -> Result<Vec<CandidateRecord>> {
        self.requested.lock().unwrap().push(top_n);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(VedaRagError::VectorStoreError("connection refused".to_string()));
        }
        Ok(self.records.iter().take(top_n).cloned().collect())
    }

    async fn count_by_category(&self) -> Result<Vec<(String, u64)>> {
        if self.fail {
            return Err(VedaRagError::VectorStoreError("connection refused".to_string()));
        }
        Ok(self.counts.clone())
    }

    async fn health(&self) -> Result<()> {
        if self.fail {
            return Err(VedaRagError::VectorStoreError("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Per-model scripted outcomes; unscripted models answer successfully
#[derive(Default)]
pub struct ScriptedGenerator {
    pub failures: HashMap<String, CandidateFailureReason>,
    pub delays: HashMap<String, Duration>,
    pub installed: Vec<String>,
    pub calls: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn failing(mut self, model: &str, reason: CandidateFailureReason) -> Self {
        self.failures.insert(model.to_string(), reason);
        self
    }

    pub fn delayed(mut self, model: &str, delay: Duration) -> Self {
        self.delays.insert(model.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, CandidateFailureReason> {
        self.calls.lock().unwrap().push(model.to_string());
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delays.get(model) {
            tokio::time::sleep(*delay).await;
        }
        match self.failures.get(model) {
            Some(reason) => Err(reason.clone()),
            None => Ok(format!("answer from {model}")),
        }
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        Ok(self.installed.clone())
    }
}

pub fn record(source: &str, page: i64, category: &str, relevance: f32, content: &str) -> CandidateRecord {
    CandidateRecord {
        content: content.to_string(),
        source: source.to_string(),
        page,
        category: Some(category.to_string()),
        relevance,
    }
}

/// Service plus handles on its doubles
pub struct Harness {
    pub service: RagService,
    pub embedder: Arc<FixedEmbedder>,
    pub store: Arc<ScriptedStore>,
    pub generator: Arc<ScriptedGenerator>,
}

pub fn harness(config: &AppConfig, store: ScriptedStore, generator: ScriptedGenerator) -> Harness {
    harness_with_embedder(config, FixedEmbedder::default(), store, generator)
}

pub fn harness_with_embedder(
    config: &AppConfig,
    embedder: FixedEmbedder,
    store: ScriptedStore,
    generator: ScriptedGenerator,
) -> Harness {
    let embedder = Arc::new(embedder);
    let store = Arc::new(store);
    let generator = Arc::new(generator);
    let service = RagService::from_services(
        config,
        Arc::clone(&embedder) as Arc<dyn Embedder>,
        Arc::clone(&store) as Arc<dyn VectorStore>,
        Arc::clone(&generator) as Arc<dyn Generator>,
    );
    Harness {
        service,
        embedder,
        store,
        generator,
    }
}
