use std::fmt;

use thiserror::Error;

use crate::rag::PipelineStage;

/// Why a single generation candidate was abandoned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateFailureReason {
    /// The service answered with an error status or the request never completed
    Service(String),
    /// The call exceeded the configured generation timeout
    Timeout,
    /// The service reports the model is not installed / cannot be loaded
    Unavailable(String),
    /// The service answered but the body was unusable
    MalformedResponse(String),
    /// Marked unavailable earlier in this session, not attempted
    PreviouslyUnavailable,
}

impl fmt::Display for CandidateFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(msg) => write!(f, "service error: {msg}"),
            Self::Timeout => write!(f, "timed out"),
            Self::Unavailable(msg) => write!(f, "model unavailable: {msg}"),
            Self::MalformedResponse(msg) => write!(f, "malformed response: {msg}"),
            Self::PreviouslyUnavailable => write!(f, "skipped (marked unavailable this session)"),
        }
    }
}

/// One failed step of the model fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub model: String,
    pub reason: CandidateFailureReason,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.model, self.reason)
    }
}

fn format_attempts(attempts: &[CandidateFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum VedaRagError {
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("All generation models failed: {}", format_attempts(.attempts))]
    GenerationExhausted { attempts: Vec<CandidateFailure> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Query cancelled while {stage}")]
    Cancelled { stage: PipelineStage },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Config loading error: {0}")]
    ConfigLoading(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VedaRagError {
    /// Short stable identifier for logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RetrievalUnavailable(_) => "RetrievalUnavailable",
            Self::GenerationExhausted { .. } => "GenerationExhausted",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::Cancelled { .. } => "Cancelled",
            Self::ConfigError(_) | Self::ConfigLoading(_) | Self::TomlParsing(_) => "Config",
            Self::HttpError(_) => "Http",
            Self::EmbeddingError(_) => "Embedding",
            Self::VectorStoreError(_) => "VectorStore",
            Self::LlmError(_) => "Llm",
            Self::Serialization(_) => "Serialization",
            Self::Io(_) => "Io",
        }
    }
}

impl From<reqwest::Error> for VedaRagError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VedaRagError>;
