//! Context assembly from retrieved passages

use std::collections::HashSet;

use crate::config::AppConfig;
use crate::config::ContextConfig;
use crate::models::Passage;
use crate::models::SourceRef;
use crate::rag::retriever::compare_passages;
use crate::rag::RetrievalResult;
use crate::taxonomy::Category;

/// Prompt context plus the attribution for what went into it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    /// Deduplicated `(source, page, category)` in rendering order
    pub sources: Vec<SourceRef>,
    pub included: usize,
    /// Passages removed to satisfy the character budget
    pub dropped: usize,
    /// Exact duplicates removed before budgeting
    pub duplicates: usize,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Groups passages by category and renders them within a character budget
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_chars: usize,
}

impl ContextAssembler {
    /// Create a new context assembler
    #[must_use]
    pub const fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.context.max_chars)
    }

    pub const fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Assemble context from a retrieval result
    #[must_use]
    pub fn assemble(&self, result: &RetrievalResult) -> AssembledContext {
        self.assemble_passages(&result.passages)
    }

    /// Deduplicate, then drop the lowest-scoring passages until the rendered
    /// text fits the budget
    #[must_use]
    pub fn assemble_passages(&self, passages: &[Passage]) -> AssembledContext {
        let mut ranked: Vec<&Passage> = passages.iter().collect();
        ranked.sort_by(|a, b| compare_passages(a, b));

        let mut seen = HashSet::new();
        let unique: Vec<&Passage> = ranked
            .into_iter()
            .filter(|p| seen.insert((p.source.as_str(), p.page, p.content.as_str())))
            .collect();
        let duplicates = passages.len() - unique.len();

        let mut kept = unique.len();
        let (text, order) = loop {
            let (text, order) = render(&unique[..kept]);
            if kept == 0 || text.chars().count() <= self.max_chars {
                break (text, order);
            }
            kept -= 1;
        };

        let mut seen_sources = HashSet::new();
        let sources = order
            .into_iter()
            .map(Passage::source_ref)
            .filter(|source| seen_sources.insert(source.clone()))
            .collect();

        AssembledContext {
            text,
            sources,
            included: kept,
            dropped: unique.len() - kept,
            duplicates,
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(ContextConfig::default().max_chars)
    }
}

/// Compact citation placed before each passage
pub fn citation_tag(passage: &Passage) -> String {
    format!("({}, p. {})", passage.source, passage.page)
}

struct Group<'a> {
    category: Category,
    total: f32,
    members: Vec<&'a Passage>,
}

/// Render score-ordered passages grouped by category, heaviest group first
fn render<'a>(passages: &[&'a Passage]) -> (String, Vec<&'a Passage>) {
    let mut groups: Vec<Group<'a>> = Vec::new();
    for &passage in passages {
        match groups.iter_mut().find(|g| g.category == passage.category) {
            Some(group) => {
                group.total += passage.score;
                group.members.push(passage);
            }
            None => groups.push(Group {
                category: passage.category,
                total: passage.score,
                members: vec![passage],
            }),
        }
    }

    // stable: equal totals keep first-appearance order
    groups.sort_by(|a, b| b.total.total_cmp(&a.total));

    let mut sections = Vec::with_capacity(groups.len());
    let mut order = Vec::with_capacity(passages.len());
    for group in groups {
        let mut section = group.category.header();
        for passage in group.members {
            section.push_str("\n\n");
            section.push_str(&citation_tag(passage));
            section.push('\n');
            section.push_str(passage.content.trim());
            order.push(passage);
        }
        sections.push(section);
    }

    (sections.join("\n\n"), order)
}
