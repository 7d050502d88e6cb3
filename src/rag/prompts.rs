//! Prompts for grounded and general-knowledge answers

use crate::rag::AssembledContext;

/// Prompt text plus the mode it was built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPrompt {
    pub text: String,
    /// No sources were found; the model is asked to rely on general knowledge
    pub general_knowledge: bool,
}

impl GenerationPrompt {
    /// Pick the grounded prompt when there is context, otherwise the fallback
    pub fn build(question: &str, context: &AssembledContext) -> Self {
        if context.is_empty() {
            Self {
                text: build_general_knowledge_prompt(question),
                general_knowledge: true,
            }
        } else {
            Self {
                text: build_scripture_rag_prompt(question, &context.text),
                general_knowledge: false,
            }
        }
    }
}

/// Build grounded RAG prompt over category-grouped passages
pub fn build_scripture_rag_prompt(question: &str, context: &str) -> String {
    format!(
        r"Based on the following spiritual texts from various sources, please provide a comprehensive answer to the question.

CONTEXT FROM SPIRITUAL TEXTS:
{context}

QUESTION: {question}

Please provide a detailed, well-structured answer that:
1. Synthesizes information from multiple sources when available
2. Notes any differences or variations between sources
3. Provides specific references to the texts, using the (source, p. page) tags, when making claims
4. Acknowledges if certain aspects need more sources for complete coverage

If the provided context doesn't fully answer the question, please indicate what additional information would be helpful.

COMPREHENSIVE ANSWER:"
    )
}

/// Build prompt used when retrieval found nothing relevant
pub fn build_general_knowledge_prompt(question: &str) -> String {
    format!(
        r"No passages from the text collection matched this question.

QUESTION: {question}

Please answer from your general knowledge of spiritual and religious texts. Make clear that the answer is not drawn from the provided collection and do not invent citations.

ANSWER:"
    )
}
