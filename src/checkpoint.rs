//! Checkpoints and the checkpoint store seam
//!
//! A [`Checkpoint`] is the sole durable artifact of a thread: the full
//! transcript, the node execution should resume at, and the resume context
//! captured at the last suspension. The most recent checkpoint for a thread
//! is the single source of truth for resumption.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::NodeId;
use crate::human::ResumeContext;
use crate::items::Conversation;

/// Opaque stable identifier scoping one independent conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Durable snapshot of one thread's conversation and execution position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: ThreadId,
    pub conversation: Conversation,
    /// The node execution resumes at.
    pub pending: NodeId,
    /// Which agent most recently transferred control into the suspension
    /// point; present exactly when `pending` is the human node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeContext>,
}

/// Storage seam for checkpoints, keyed by thread id.
///
/// Implementations must tolerate concurrent access from distinct threads;
/// within one thread the execution engine serializes all puts, so
/// last-writer-wins per key is sufficient. A `put` must be atomic from the
/// caller's perspective: a reader never observes a partially written
/// checkpoint.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>>;

    async fn put(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Discards a thread's checkpoint. Abandoned threads are otherwise kept
    /// until the caller explicitly deletes them.
    async fn delete(&self, thread_id: &ThreadId) -> Result<()>;
}

/// A simple in-memory checkpoint store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCheckpointStore {
    inner: Arc<Mutex<HashMap<ThreadId, Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>> {
        let map = self.inner.lock().unwrap();
        Ok(map.get(thread_id).cloned())
    }

    async fn put(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut map = self.inner.lock().unwrap();
        map.insert(checkpoint.thread_id.clone(), checkpoint);
        Ok(())
    }

    async fn delete(&self, thread_id: &ThreadId) -> Result<()> {
        let mut map = self.inner.lock().unwrap();
        map.remove(thread_id);
        Ok(())
    }
}
