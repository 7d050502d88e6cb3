//! RAG (Retrieval-Augmented Generation) over the scripture collection
//!
//! One `answer` call runs a fixed pipeline:
//! - Complexity scoring decides how many passages to retrieve
//! - Hybrid retrieval blends vector similarity with keyword overlap
//! - Context assembly groups passages by category within a character budget
//! - Generation walks the hardware profile's model candidate chain
//!
//! # Examples
//!
//! ```rust,no_run
//! use vedarag::config::AppConfig;
//! use vedarag::models::HardwareProfile;
//! use vedarag::rag::RagService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = RagService::new(&config)?;
//!
//!     let answer = service
//!         .answer("What is moksha?", HardwareProfile::Cpu, None)
//!         .await?;
//!     println!("Answer: {}", answer.text);
//!     println!("Sources: {}", answer.sources.len());
//!
//!     Ok(())
//! }
//! ```

pub mod complexity;
pub mod context;
pub mod pipeline;
pub mod prompts;
pub mod retriever;
pub mod terms;

pub use complexity::ComplexityScorer;
pub use context::AssembledContext;
pub use context::ContextAssembler;
pub use pipeline::CategoryReport;
pub use pipeline::PipelineStage;
pub use pipeline::RagService;
pub use pipeline::ServiceHealth;
pub use prompts::GenerationPrompt;
pub use retriever::HybridRetriever;
pub use retriever::RetrievalResult;
pub use retriever::RetrieverSettings;
