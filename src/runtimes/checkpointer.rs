//! Checkpoint persistence: the [`Checkpointer`] trait and the in-memory
//! backend.
//!
//! A checkpoint captures everything needed to resume a thread: its state,
//! step counter, and frontier. Backends store the full step history per
//! thread, which is what makes time travel ([`Checkpointer::load_at`])
//! possible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::runtimes::session::ThreadSession;
use crate::state::AgentState;
use crate::types::NodeKind;

/// Which persistence backend a runtime should construct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckpointerType {
    /// Volatile storage, scoped to the process. The default.
    InMemory,
    /// Durable SQLite-backed storage.
    #[cfg(feature = "sqlite")]
    SQLite,
}

/// A point-in-time capture of one thread's execution.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    /// The thread this checkpoint belongs to.
    pub thread_id: String,
    /// Superstep counter at capture time.
    pub step: u64,
    /// Full state (messages and extra channels, with versions).
    pub state: AgentState,
    /// Nodes scheduled to run next.
    pub frontier: Vec<NodeKind>,
    /// Capture timestamp.
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Captures the given session under `thread_id`.
    #[must_use]
    pub fn from_session(thread_id: &str, session: &ThreadSession) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            step: session.step,
            state: session.state.clone(),
            frontier: session.frontier.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Rebuilds an in-memory session from a stored checkpoint.
#[must_use]
pub fn restore_thread_session(checkpoint: &Checkpoint) -> ThreadSession {
    ThreadSession {
        state: checkpoint.state.clone(),
        step: checkpoint.step,
        frontier: checkpoint.frontier.clone(),
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("checkpointer backend error: {message}")]
    #[diagnostic(
        code(relaygraph::checkpointer::backend),
        help("Check backend connectivity and schema.")
    )]
    Backend { message: String },

    #[error("checkpointer error: {message}")]
    #[diagnostic(code(relaygraph::checkpointer::other))]
    Other { message: String },
}

pub type Result<T> = std::result::Result<T, CheckpointerError>;

/// Pluggable persistence seam for thread checkpoints.
///
/// Implementations store one history of checkpoints per thread, keyed by
/// step. Saving the same step twice overwrites the earlier capture.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persist a checkpoint.
    async fn save(&self, checkpoint: Checkpoint) -> Result<()>;

    /// The most recent checkpoint for a thread, if any.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// The checkpoint captured at exactly `step`, if it exists. This is the
    /// time-travel entry point: resume from here and history forks.
    async fn load_at(&self, thread_id: &str, step: u64) -> Result<Option<Checkpoint>>;

    /// All thread ids with at least one checkpoint.
    async fn list_threads(&self) -> Result<Vec<String>>;

    /// Drop a thread's entire history.
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;
}

type ThreadHistory = Arc<RwLock<Vec<Checkpoint>>>;

/// Process-local checkpointer for tests and development.
///
/// Each thread's history sits behind its own lock, so saves on different
/// threads never contend. The outer map lock is held only to look up or
/// insert a history handle.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    threads: RwLock<FxHashMap<String, ThreadHistory>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn history(&self, thread_id: &str) -> ThreadHistory {
        if let Some(history) = self.threads.read().get(thread_id) {
            return history.clone();
        }
        self.threads
            .write()
            .entry(thread_id.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let history = self.history(&checkpoint.thread_id);
        let mut guard = history.write();
        match guard.iter_mut().find(|c| c.step == checkpoint.step) {
            Some(existing) => *existing = checkpoint,
            None => {
                guard.push(checkpoint);
                guard.sort_by_key(|c| c.step);
            }
        }
        Ok(())
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let history = match self.threads.read().get(thread_id) {
            Some(h) => h.clone(),
            None => return Ok(None),
        };
        let guard = history.read();
        Ok(guard.last().cloned())
    }

    async fn load_at(&self, thread_id: &str, step: u64) -> Result<Option<Checkpoint>> {
        let history = match self.threads.read().get(thread_id) {
            Some(h) => h.clone(),
            None => return Ok(None),
        };
        let guard = history.read();
        Ok(guard.iter().find(|c| c.step == step).cloned())
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.threads.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.threads.write().remove(thread_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(thread_id: &str, step: u64) -> Checkpoint {
        Checkpoint {
            thread_id: thread_id.to_string(),
            step,
            state: AgentState::new_with_user_message("hi"),
            frontier: vec![NodeKind::Custom("model".into())],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn latest_and_at_see_different_steps() {
        let cp = InMemoryCheckpointer::new();
        cp.save(checkpoint("t1", 1)).await.unwrap();
        cp.save(checkpoint("t1", 2)).await.unwrap();
        cp.save(checkpoint("t1", 3)).await.unwrap();

        assert_eq!(cp.load_latest("t1").await.unwrap().unwrap().step, 3);
        assert_eq!(cp.load_at("t1", 2).await.unwrap().unwrap().step, 2);
        assert!(cp.load_at("t1", 9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let cp = InMemoryCheckpointer::new();
        cp.save(checkpoint("alpha", 1)).await.unwrap();
        cp.save(checkpoint("beta", 5)).await.unwrap();

        assert_eq!(cp.load_latest("alpha").await.unwrap().unwrap().step, 1);
        assert_eq!(cp.load_latest("beta").await.unwrap().unwrap().step, 5);
        assert_eq!(cp.list_threads().await.unwrap(), vec!["alpha", "beta"]);

        cp.delete_thread("alpha").await.unwrap();
        assert!(cp.load_latest("alpha").await.unwrap().is_none());
        assert_eq!(cp.load_latest("beta").await.unwrap().unwrap().step, 5);
    }

    #[tokio::test]
    async fn saving_same_step_overwrites() {
        let cp = InMemoryCheckpointer::new();
        cp.save(checkpoint("t1", 1)).await.unwrap();
        let mut replacement = checkpoint("t1", 1);
        replacement.frontier = vec![NodeKind::End];
        cp.save(replacement).await.unwrap();

        let loaded = cp.load_latest("t1").await.unwrap().unwrap();
        assert_eq!(loaded.frontier, vec![NodeKind::End]);
    }
}
