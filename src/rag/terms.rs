//! Word-level helpers shared by the complexity scorer and keyword matching

use std::collections::HashSet;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "what", "who", "how", "why", "when", "where",
    "which", "that", "this", "with", "from", "into", "about", "does", "did", "has", "have",
    "his", "her", "its", "their", "they", "them", "you", "your", "our", "not", "but", "can",
    "tell", "please", "according", "between", "across", "all", "compare",
];

/// Lowercased alphanumeric words, in order
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `phrase` (already lowercased, space separated) occurs as a run of whole words
pub fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }
    words
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}

/// Distinct content words used for the keyword signal, in first-seen order
pub fn keyword_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    words(text)
        .into_iter()
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Fraction of `terms` present as whole words in `content`, in [0, 1]
pub fn keyword_overlap(terms: &[String], content: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let content_words: HashSet<String> = words(content).into_iter().collect();
    let hits = terms.iter().filter(|t| content_words.contains(*t)).count();
    hits as f32 / terms.len() as f32
}
