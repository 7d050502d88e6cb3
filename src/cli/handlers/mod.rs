//! CLI command handlers module
//!
//! This module is organized by functional domains:
//! - ask: single questions and the interactive shell
//! - info: health, statistics and model chain display

pub mod ask;
pub mod info;

// Re-export all public handlers
pub use ask::*;
pub use info::*;
