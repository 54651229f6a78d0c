//! Observability trail: progress records emitted by every decision and
//! action step so external tracing (SSE, dashboards) can follow a job.
//!
//! [`BroadcastObserver`] fans records out over `tokio::sync::broadcast`;
//! subscribers that lag simply miss records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::message::Message;

/// One traced unit (a job, a decision, an action run).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observable {
    pub id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,

    pub agent: String,
    pub name: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<Creation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub progress: Vec<Progress>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<Completion>,
}

impl Observable {
    /// A child record of `self` with a caller-provided id.
    pub fn child(&self, id: u64, name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id,
            parent_id: Some(self.id),
            agent: self.agent.clone(),
            name: name.into(),
            icon: icon.into(),
            ..Default::default()
        }
    }

    pub fn push_progress(&mut self, progress: Progress) {
        self.progress.push(progress);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Creation {
    pub at: Option<DateTime<Utc>>,

    /// Snapshot of what started this step (prompt, tool list, params).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_result: Option<String>,
}

impl Progress {
    pub fn error(err: impl ToString) -> Self {
        Self {
            error: Some(err.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation: Vec<Message>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_result: Option<String>,
}

/// Sink for observability records.
pub trait Observer: Send + Sync {
    /// Allocate a fresh record with a unique id.
    fn new_observable(&self) -> Observable;

    /// Publish the current snapshot of a record.
    fn update(&self, observable: Observable);
}

/// Observer publishing every update on a broadcast channel.
pub struct BroadcastObserver {
    next_id: AtomicU64,
    sender: broadcast::Sender<Arc<Observable>>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            next_id: AtomicU64::new(1),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Observable>> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastObserver {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Observer for BroadcastObserver {
    fn new_observable(&self) -> Observable {
        Observable {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            creation: Some(Creation {
                at: Some(Utc::now()),
                request: None,
            }),
            ..Default::default()
        }
    }

    fn update(&self, observable: Observable) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(observable));
    }
}
