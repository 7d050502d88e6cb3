use std::path::Path;
use std::time::Duration;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::embeddings::EmbeddingProvider;
use crate::models::HardwareProfile;
use crate::VedaRagError;

/// Prefix for environment overrides, e.g. `VEDARAG__VECTOR_STORE__URL`
pub const ENV_PREFIX: &str = "VEDARAG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_log_file_prefix() -> String {
    "vedarag.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_directory(),
            file_prefix: default_log_file_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "all-minilm".to_string()
}

const fn default_embedding_dimension() -> usize {
    384
}

const fn default_embedding_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            endpoint: default_ollama_endpoint(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_key: None,
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_vector_store_url")]
    pub url: String,
    /// Weaviate class holding the ingested passages
    #[serde(default = "default_class_name")]
    pub class_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_vector_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_vector_store_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_class_name() -> String {
    "SpiritualText".to_string()
}

const fn default_vector_timeout_secs() -> u64 {
    30
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_vector_store_url(),
            class_name: default_class_name(),
            api_key: None,
            timeout_secs: default_vector_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-candidate generation timeout
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_top_p() -> f32 {
    0.9
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_generation_timeout_secs() -> u64 {
    180
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Blended scores below this are never returned
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,
    /// Share of the blended score taken from keyword matching, in [0, 1]
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,
    /// Candidates requested from the store per wanted passage
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
}

const fn default_similarity_floor() -> f32 {
    0.3
}

const fn default_keyword_weight() -> f32 {
    0.3
}

const fn default_candidate_multiplier() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_floor: default_similarity_floor(),
            keyword_weight: default_keyword_weight(),
            candidate_multiplier: default_candidate_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Character budget for the assembled context
    #[serde(default = "default_max_context_chars")]
    pub max_chars: usize,
}

const fn default_max_context_chars() -> usize {
    12_000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_context_chars(),
        }
    }
}

/// Candidate chains per hardware profile, most capable first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_gpu_chain")]
    pub gpu: Vec<String>,
    #[serde(default = "default_cpu_chain")]
    pub cpu: Vec<String>,
}

fn default_gpu_chain() -> Vec<String> {
    vec![
        "gemma3:27b".to_string(),
        "gemma3:12b".to_string(),
        "gemma2:2b".to_string(),
    ]
}

fn default_cpu_chain() -> Vec<String> {
    vec![
        "gemma3:12b".to_string(),
        "gemma3:4b".to_string(),
        "gemma2:2b".to_string(),
    ]
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            gpu: default_gpu_chain(),
            cpu: default_cpu_chain(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Supplied by the deployment; the CLI `--profile` flag takes precedence
    #[serde(default)]
    pub profile: HardwareProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, layered with environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        Self::from_sources(Some(path.as_ref()))
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!(
                "Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            tracing::warn!("No config file found, using built-in defaults");
            Self::from_sources(None)
        }
    }

    /// Build from an optional file plus `VEDARAG__*` variables, then validate
    pub fn from_sources(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(VedaRagError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Config file not found: {}", path.display()),
                )));
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("models.gpu")
                .with_list_parse_key("models.cpu"),
        );

        // Deployment scripts export these two directly
        builder = builder
            .set_override_option("vector_store.url", std::env::var("WEAVIATE_URL").ok())?
            .set_override_option("llm.endpoint", std::env::var("OLLAMA_URL").ok())?;

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, without environment layering
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.retrieval.similarity_floor) {
            return Err(VedaRagError::ConfigError(format!(
                "retrieval.similarity_floor must be within [0, 1], got {}",
                self.retrieval.similarity_floor
            )));
        }
        if !unit.contains(&self.retrieval.keyword_weight) {
            return Err(VedaRagError::ConfigError(format!(
                "retrieval.keyword_weight must be within [0, 1], got {}",
                self.retrieval.keyword_weight
            )));
        }
        if self.retrieval.candidate_multiplier == 0 {
            return Err(VedaRagError::ConfigError(
                "retrieval.candidate_multiplier must be at least 1".to_string(),
            ));
        }
        if self.context.max_chars == 0 {
            return Err(VedaRagError::ConfigError(
                "context.max_chars must be greater than zero".to_string(),
            ));
        }
        if self.embeddings.dimension == 0 {
            return Err(VedaRagError::ConfigError(
                "embeddings.dimension must be greater than zero".to_string(),
            ));
        }

        for (name, chain) in [("models.gpu", &self.models.gpu), ("models.cpu", &self.models.cpu)] {
            if chain.is_empty() {
                return Err(VedaRagError::ConfigError(format!(
                    "{name} must list at least one model"
                )));
            }
            if chain.iter().any(|model| model.trim().is_empty()) {
                return Err(VedaRagError::ConfigError(format!(
                    "{name} contains an empty model name"
                )));
            }
        }

        for (name, secs) in [
            ("embeddings.timeout_secs", self.embeddings.timeout_secs),
            ("vector_store.timeout_secs", self.vector_store.timeout_secs),
            ("llm.timeout_secs", self.llm.timeout_secs),
        ] {
            if secs == 0 {
                return Err(VedaRagError::ConfigError(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        for (name, endpoint) in [
            ("embeddings.endpoint", &self.embeddings.endpoint),
            ("vector_store.url", &self.vector_store.url),
            ("llm.endpoint", &self.llm.endpoint),
        ] {
            Url::parse(endpoint).map_err(|e| {
                VedaRagError::ConfigError(format!("{name} is not a valid URL ({endpoint}): {e}"))
            })?;
        }

        Ok(())
    }

    /// Get the embedding call timeout
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embeddings.timeout_secs)
    }

    /// Get the vector search timeout
    pub fn vector_search_timeout(&self) -> Duration {
        Duration::from_secs(self.vector_store.timeout_secs)
    }

    /// Get the per-candidate generation timeout
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    /// Get the configured hardware profile
    pub fn hardware_profile(&self) -> HardwareProfile {
        self.hardware.profile
    }
}
