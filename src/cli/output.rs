//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `vedarag` CLI

use std::io::Write;

use crate::llm::ModelCandidateChain;
use crate::models::Answer;
use crate::models::AnswerMode;
use crate::models::SourceRef;
use crate::rag::CategoryReport;
use crate::rag::ServiceHealth;
use crate::taxonomy::Category;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// Returns the original string when it fits, otherwise the first
/// `max_chars` characters followed by "..."
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Print a generated answer with its attribution
pub fn print_answer(answer: &Answer, show_context: bool) {
    println!("\n📝 Answer:");
    println!("{}", "━".repeat(60));
    println!("{}", answer.text.trim());
    println!("{}", "━".repeat(60));

    if answer.mode == AnswerMode::GeneralKnowledge {
        print_warning("No relevant passages found; answered from general knowledge");
    } else if show_context {
        print_sources_by_category(&answer.sources);
    } else {
        println!("\n📚 Sources ({}):", answer.sources.len());
        for (idx, source) in answer.sources.iter().enumerate() {
            println!("  {}. {}", idx + 1, source);
        }
    }

    if show_context {
        println!(
            "\n🔎 Complexity: {} | Sources requested: {} | Model: {}",
            answer.complexity_class, answer.target_k, answer.model
        );
    }
}

/// Print sources under per-category headers in answer order
pub fn print_sources_by_category(sources: &[SourceRef]) {
    println!("\n📚 Sources ({}):", sources.len());
    let mut categories: Vec<Category> = Vec::new();
    for source in sources {
        if !categories.contains(&source.category) {
            categories.push(source.category);
        }
    }
    for category in categories {
        println!("\n  {}", category.header());
        for source in sources.iter().filter(|s| s.category == category) {
            println!("    - {} (page {})", truncate_str(&source.source, 60), source.page);
        }
    }
}

/// Print the resolved fallback chain
pub fn print_chain(chain: &ModelCandidateChain, unavailable: &[String]) {
    println!("🧠 Model chain ({} profile):", chain.profile());
    for (idx, model) in chain.iter().enumerate() {
        let marker = if unavailable.iter().any(|m| m == model) {
            " (unavailable this session)"
        } else {
            ""
        };
        println!("  {}. {}{}", idx + 1, model, marker);
    }
}

/// Print service health and which chain candidates are installed
pub fn print_health(health: &ServiceHealth) {
    println!("🩺 Service health");
    match &health.vector_store {
        Ok(()) => print_success("Vector store reachable"),
        Err(e) => print_error(&format!("Vector store unreachable: {e}")),
    }
    match &health.generation {
        Ok(()) => print_success(&format!(
            "Generation service reachable ({} models installed)",
            health.installed_models.len()
        )),
        Err(e) => print_error(&format!("Generation service unreachable: {e}")),
    }

    if health.generation.is_ok() {
        let missing = health.missing_candidates();
        for model in health.chain.iter() {
            if missing.contains(&model) {
                print_warning(&format!("{model} is not installed"));
            } else {
                print_success(&format!("{model} is installed"));
            }
        }
    }
}

/// Print passage counts per category
pub fn print_category_report(report: &CategoryReport) {
    println!("📊 Passages by category");
    if report.counts.is_empty() {
        print_warning("The collection is empty");
        return;
    }
    for entry in &report.counts {
        println!("  {:<14} {:>8}", entry.category.label(), entry.count);
    }
    println!("  {:<14} {:>8}", "TOTAL", report.total);
}

pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    println!("❌ {msg}");
}

pub fn print_prompt(msg: &str) -> std::io::Result<()> {
    print!("{msg}");
    std::io::stdout().flush()
}
