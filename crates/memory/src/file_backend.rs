//! File-backed knowledge base: persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded [`KnowledgeEntry`]. Entries are loaded on
//! creation and the whole file is rewritten on every mutation.

use async_trait::async_trait;
use autoclaw_core::error::MemoryError;
use autoclaw_core::knowledge::RagDb;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{KnowledgeEntry, rank};

pub struct FileKnowledge {
    path: PathBuf,
    entries: Arc<RwLock<Vec<KnowledgeEntry>>>,
}

impl FileKnowledge {
    /// Open (or lazily create) the store at `path`.
    pub fn new(path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "File knowledge base loaded");
        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    fn load_from_disk(path: &Path) -> Vec<KnowledgeEntry> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<KnowledgeEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted knowledge entry");
                    None
                }
            })
            .collect()
    }

    async fn flush(&self, entries: &[KnowledgeEntry]) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create knowledge directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for entry in entries {
            let line = serde_json::to_string(entry).map_err(|e| {
                MemoryError::Storage(format!("Failed to serialize knowledge entry: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to write knowledge file: {e}")))
    }
}

#[async_trait]
impl RagDb for FileKnowledge {
    async fn store(&self, text: &str) -> Result<(), MemoryError> {
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        next.push(KnowledgeEntry::new(text));
        // Commit to memory only once the file agrees.
        self.flush(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(rank(&entries, query, k))
    }

    async fn reset(&self) -> Result<(), MemoryError> {
        let mut entries = self.entries.write().await;
        self.flush(&[]).await?;
        entries.clear();
        Ok(())
    }

    async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}
