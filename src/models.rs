use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::taxonomy::Category;

/// Hard upper bound on passages retrieved for one query
pub const MAX_SOURCES: usize = 15;

/// Hardware class the deployment runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareProfile {
    Gpu,
    #[default]
    Cpu,
}

impl HardwareProfile {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gpu => "gpu",
            Self::Cpu => "cpu",
        }
    }
}

impl fmt::Display for HardwareProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HardwareProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(Self::Gpu),
            "cpu" => Ok(Self::Cpu),
            other => Err(format!("unknown hardware profile '{other}' (expected gpu or cpu)")),
        }
    }
}

/// Retrieved unit of source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub source: String,
    pub page: u32,
    pub category: Category,
    /// Blended relevance, only meaningful inside one retrieval call
    pub score: f32,
}

impl Passage {
    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            source: self.source.clone(),
            page: self.page,
            category: self.category,
        }
    }
}

/// Coarse query bucket used to size retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityClass {
    Simple,
    Normal,
    Complex,
}

impl fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Simple => "simple",
            Self::Normal => "normal",
            Self::Complex => "complex",
        };
        f.write_str(name)
    }
}

/// A scored query, one per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub complexity_class: ComplexityClass,
    pub target_k: usize,
}

/// Caller input for one `answer` call
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub question: String,
    pub hardware_profile: HardwareProfile,
    /// Explicit source count, must be within 1..=15 when given
    pub override_k: Option<usize>,
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>, hardware_profile: HardwareProfile) -> Self {
        Self {
            question: question.into(),
            hardware_profile,
            override_k: None,
        }
    }

    #[must_use]
    pub fn with_sources(mut self, override_k: Option<usize>) -> Self {
        self.override_k = override_k;
        self
    }
}

/// Attribution triple for a passage that made it into the prompt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub page: u32,
    pub category: Category,
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (page {}) [{}]", self.source, self.page, self.category)
    }
}

/// Whether the answer was grounded in retrieved passages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    Grounded,
    GeneralKnowledge,
}

/// Final result of one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub query_id: Uuid,
    pub text: String,
    pub sources: Vec<SourceRef>,
    pub mode: AnswerMode,
    /// Model that produced `text`
    pub model: String,
    pub complexity_class: ComplexityClass,
    pub target_k: usize,
    pub generated_at: DateTime<Utc>,
}

impl Answer {
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// Stored passage count for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: u64,
}
