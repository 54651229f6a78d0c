//! Knowledge-base (`RagDb`) implementations for autoclaw.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileKnowledge;
pub use in_memory::InMemoryKnowledge;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Keyword relevance: occurrences of each query term, normalised by length.
/// Terms shorter than three characters are ignored unless the query has no
/// other terms.
pub(crate) fn keyword_score(content: &str, query: &str) -> f32 {
    let content_lower = content.to_lowercase();
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(str::to_lowercase)
        .collect();
    let terms = if terms.is_empty() {
        vec![query.trim().to_lowercase()]
    } else {
        terms
    };

    let occurrences: usize = terms
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| content_lower.matches(t.as_str()).count())
        .sum();
    occurrences as f32 / (content.len() as f32 / 100.0).max(1.0)
}

/// Top `k` entries with a positive score, best first.
pub(crate) fn rank(entries: &[KnowledgeEntry], query: &str, k: usize) -> Vec<String> {
    let mut scored: Vec<(f32, &KnowledgeEntry)> = entries
        .iter()
        .map(|e| (keyword_score(&e.content, query), e))
        .filter(|(score, _)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(k)
        .map(|(_, e)| e.content.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_counts_each_term() {
        assert!(keyword_score("Rust and tokio", "rust tokio") > keyword_score("Rust only", "rust tokio"));
        assert_eq!(keyword_score("nothing here", "weather"), 0.0);
    }

    #[test]
    fn rank_orders_and_truncates() {
        let entries = vec![
            KnowledgeEntry::new("boston weather is cold"),
            KnowledgeEntry::new("weather weather weather"),
            KnowledgeEntry::new("unrelated"),
        ];
        let hits = rank(&entries, "weather", 1);
        assert_eq!(hits, vec!["weather weather weather"]);
    }
}
