//! Knowledge base trait: the RAG store consulted before each job.
//!
//! The engine only needs four operations: store a snippet of text, search
//! for the `k` most relevant snippets, wipe everything and count entries.

use async_trait::async_trait;
use crate::error::MemoryError;

#[async_trait]
pub trait RagDb: Send + Sync {
    /// Persist one snippet of text.
    async fn store(&self, text: &str) -> Result<(), MemoryError>;

    /// The `k` most relevant snippets for `query`, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, MemoryError>;

    /// Remove every entry.
    async fn reset(&self) -> Result<(), MemoryError>;

    /// Number of stored entries.
    async fn count(&self) -> usize;
}
