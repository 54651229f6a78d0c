//! Built-in action implementations for autoclaw.
//!
//! A deliberately small catalog: knowledge-base search and store, plus a
//! URL fetcher. Anything implementing `autoclaw_core::Action` can be
//! registered next to these.

pub mod fetch_url;
pub mod memory_search;
pub mod memory_store;

pub use fetch_url::FetchUrlAction;
pub use memory_search::MemorySearchAction;
pub use memory_store::MemoryStoreAction;

use autoclaw_core::{ActionSet, Error, RagDb};
use std::sync::Arc;

/// Every name [`catalog`] understands.
pub const CATALOG: &[&str] = &[
    memory_search::NAME,
    memory_store::NAME,
    fetch_url::NAME,
];

/// Resolve configured action names into an [`ActionSet`].
///
/// Memory actions need a knowledge base; asking for one without it is a
/// configuration error, as is an unknown name.
pub fn catalog(names: &[String], rag: Option<Arc<dyn RagDb>>) -> Result<ActionSet, Error> {
    let mut set = ActionSet::new();
    for name in names {
        match name.as_str() {
            memory_search::NAME => set.register(Arc::new(MemorySearchAction::new(require_rag(name, &rag)?))),
            memory_store::NAME => set.register(Arc::new(MemoryStoreAction::new(require_rag(name, &rag)?))),
            fetch_url::NAME => set.register(Arc::new(FetchUrlAction::new())),
            other => {
                return Err(Error::Config {
                    message: format!(
                        "unknown action '{other}' (available: {})",
                        CATALOG.join(", ")
                    ),
                });
            }
        }
    }
    Ok(set)
}

fn require_rag(name: &str, rag: &Option<Arc<dyn RagDb>>) -> Result<Arc<dyn RagDb>, Error> {
    rag.clone().ok_or_else(|| Error::Config {
        message: format!("action '{name}' requires a knowledge base ([memory] backend)"),
    })
}
