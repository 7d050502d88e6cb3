//! Category taxonomy for the scripture corpus
//!
//! Categories are assigned by an ordered list of keyword rules evaluated
//! first-match-wins against a lowercased text (normally a source file name).
//! The same rules are used when the store hands back a record whose category
//! label is missing or unknown.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Text category label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Purana,
    Gita,
    Mahabharata,
    Sastra,
    SaiBaba,
    Spiritual,
}

impl Category {
    pub const ALL: [Self; 6] = [
        Self::Purana,
        Self::Gita,
        Self::Mahabharata,
        Self::Sastra,
        Self::SaiBaba,
        Self::Spiritual,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Purana => "Purana",
            Self::Gita => "Gita",
            Self::Mahabharata => "Mahabharata",
            Self::Sastra => "Sastra",
            Self::SaiBaba => "SaiBaba",
            Self::Spiritual => "Spiritual",
        }
    }

    /// Header line used when rendering a group of passages
    pub fn header(self) -> String {
        format!("=== {} SOURCES ===", self.label().to_uppercase())
    }

    /// Case-insensitive lookup of a stored label
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One keyword rule: any keyword contained in the text selects `category`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub keywords: Vec<String>,
    pub category: Category,
}

impl CategoryRule {
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            category,
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

const DEFAULT_RULES: &[(Category, &[&str])] = &[
    (
        Category::Purana,
        &["purana", "bhagavata", "vishnu", "shiva", "devi"],
    ),
    (Category::Gita, &["gita", "bhagavad"]),
    (Category::Mahabharata, &["mahabharata", "mahabharat"]),
    (
        Category::Sastra,
        &["sastra", "shastra", "artha", "kama", "dharma"],
    ),
    (
        Category::SaiBaba,
        &["sai", "baba", "vahini", "sathya", "sathyam", "shivam", "sundaram"],
    ),
];

/// Ordered rule list with a fallback category
#[derive(Debug, Clone)]
pub struct Taxonomy {
    rules: Vec<CategoryRule>,
    fallback: Category,
}

impl Taxonomy {
    pub fn new(rules: Vec<CategoryRule>, fallback: Category) -> Self {
        Self { rules, fallback }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// First matching rule wins; unmatched text gets the fallback
    pub fn classify(&self, text: &str) -> Category {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map_or(self.fallback, |rule| rule.category)
    }

    /// Use the stored label when it is known, otherwise classify the source name
    pub fn resolve(&self, label: Option<&str>, source: &str) -> Category {
        label
            .and_then(Category::from_label)
            .unwrap_or_else(|| self.classify(source))
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(category, keywords)| CategoryRule::new(*category, keywords))
            .collect();
        Self::new(rules, Category::Spiritual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_sources() {
        let taxonomy = Taxonomy::default();
        assert_eq!(taxonomy.classify("Vishnu_Purana_Vol1.pdf"), Category::Purana);
        assert_eq!(taxonomy.classify("The Bhagavad Gita.pdf"), Category::Gita);
        assert_eq!(taxonomy.classify("MAHABHARATA-book3.pdf"), Category::Mahabharata);
        assert_eq!(taxonomy.classify("arthashastra.pdf"), Category::Sastra);
        assert_eq!(taxonomy.classify("Prema_Vahini.pdf"), Category::SaiBaba);
        assert_eq!(taxonomy.classify("upanishads.pdf"), Category::Spiritual);
    }

    #[test]
    fn test_first_match_wins() {
        let taxonomy = Taxonomy::default();
        // the Purana rule ("bhagavata") is checked before the Gita rule ("gita")
        assert_eq!(taxonomy.classify("bhagavata_gita_notes.pdf"), Category::Purana);
        // "shivam" contains "shiva", which the Purana rule sees first
        assert_eq!(taxonomy.classify("sathyam_shivam.pdf"), Category::Purana);
    }

    #[test]
    fn test_custom_rules_are_data() {
        let taxonomy = Taxonomy::new(
            vec![CategoryRule::new(Category::Gita, &["UDDHAVA"])],
            Category::Sastra,
        );
        assert_eq!(taxonomy.classify("uddhava gita"), Category::Gita);
        assert_eq!(taxonomy.classify("anything else"), Category::Sastra);
        assert_eq!(taxonomy.rules().len(), 1);
    }

    #[test]
    fn test_resolve_prefers_known_label() {
        let taxonomy = Taxonomy::default();
        assert_eq!(
            taxonomy.resolve(Some("saibaba"), "vishnu_purana.pdf"),
            Category::SaiBaba
        );
        assert_eq!(
            taxonomy.resolve(Some("Unknown"), "vishnu_purana.pdf"),
            Category::Purana
        );
        assert_eq!(taxonomy.resolve(None, "gita.pdf"), Category::Gita);
    }

    #[test]
    fn test_header() {
        assert_eq!(Category::SaiBaba.header(), "=== SAIBABA SOURCES ===");
    }
}
