//! In-memory knowledge base: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use autoclaw_core::error::MemoryError;
use autoclaw_core::knowledge::RagDb;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{KnowledgeEntry, rank};

/// Stores snippets in a Vec; nothing survives the process.
pub struct InMemoryKnowledge {
    entries: Arc<RwLock<Vec<KnowledgeEntry>>>,
}

impl InMemoryKnowledge {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryKnowledge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RagDb for InMemoryKnowledge {
    async fn store(&self, text: &str) -> Result<(), MemoryError> {
        self.entries.write().await.push(KnowledgeEntry::new(text));
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(rank(&entries, query, k))
    }

    async fn reset(&self) -> Result<(), MemoryError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}
