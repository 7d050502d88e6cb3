//! Rule-based query complexity scoring
//!
//! Surface markers in the question decide how many passages to retrieve:
//! definitional questions need few, comparative or survey questions need many.

use crate::models::ComplexityClass;
use crate::models::Query;
use crate::models::MAX_SOURCES;
use crate::rag::terms::contains_phrase;
use crate::rag::terms::words;

/// Markers of a narrow, definitional question
pub const DEFINITIONAL_MARKERS: &[&str] = &[
    "what is",
    "what are",
    "who is",
    "who was",
    "define",
    "definition",
    "meaning of",
];

/// Markers of a comparative or aggregative question
pub const COMPARATIVE_MARKERS: &[&str] = &[
    "compare",
    "comparison",
    "contrast",
    "versus",
    "overview",
    "across",
    "all",
    "between",
    "among",
    "various",
    "different",
];

pub const SIMPLE_TARGET: usize = 3;
pub const NORMAL_TARGET: usize = 5;
pub const COMPLEX_MIN_TARGET: usize = 8;
pub const COMPLEX_MAX_TARGET: usize = 12;
const COMPLEX_STEP: usize = 2;

/// Pure, deterministic scorer; never fails
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityScorer;

impl ComplexityScorer {
    pub const fn new() -> Self {
        Self
    }

    /// Classify the question and derive its source count
    pub fn score(&self, query_text: &str) -> Query {
        let tokens = words(query_text);
        let comparative = count_markers(&tokens, COMPARATIVE_MARKERS);
        let definitional = count_markers(&tokens, DEFINITIONAL_MARKERS);

        let (complexity_class, target_k) = if comparative > 0 {
            (ComplexityClass::Complex, complex_target(comparative))
        } else if definitional > 0 {
            (ComplexityClass::Simple, SIMPLE_TARGET)
        } else {
            (ComplexityClass::Normal, NORMAL_TARGET)
        };

        Query {
            text: query_text.to_string(),
            complexity_class,
            target_k: target_k.min(MAX_SOURCES),
        }
    }

    /// Like [`score`](Self::score), but an explicit count wins, clamped to 1..=15
    pub fn score_with_override(&self, query_text: &str, override_k: Option<usize>) -> Query {
        let mut query = self.score(query_text);
        if let Some(k) = override_k {
            query.target_k = k.clamp(1, MAX_SOURCES);
        }
        query
    }
}

/// Number of distinct markers present as whole words
pub fn count_markers(tokens: &[String], markers: &[&str]) -> usize {
    markers
        .iter()
        .filter(|marker| contains_phrase(tokens, marker))
        .count()
}

/// Grows with the number of comparative markers, within the complex range
fn complex_target(markers: usize) -> usize {
    let extra = markers.saturating_sub(1).saturating_mul(COMPLEX_STEP);
    (COMPLEX_MIN_TARGET + extra).min(COMPLEX_MAX_TARGET)
}
