//! Text preprocessing before embedding generation

use tracing::debug;

use crate::errors::VedaRagError;

/// Normalize whitespace, drop control characters and cap the length
pub fn prepare_text_for_embedding(text: &str, max_chars: usize) -> Result<String, VedaRagError> {
    let sanitized = sanitize_text(text);

    if sanitized.is_empty() {
        return Err(VedaRagError::EmbeddingError(
            "Text contains only whitespace after preprocessing".to_string(),
        ));
    }

    let prepared = truncate_at_word(&sanitized, max_chars);
    debug!(
        "Preprocessed text: {} -> {} chars",
        text.chars().count(),
        prepared.chars().count()
    );
    Ok(prepared)
}

/// Replace control characters with spaces and collapse runs of whitespace
fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Cut at the last word boundary within `max_chars` (character count, not bytes)
fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let head: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some_and(char::is_whitespace) {
        return head;
    }
    match head.rfind(' ') {
        Some(idx) if idx > 0 => head[..idx].to_string(),
        _ => head,
    }
}
