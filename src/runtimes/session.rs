//! In-memory execution state for a single thread.

use crate::state::AgentState;
use crate::types::NodeKind;

/// Everything a thread needs to take its next superstep.
///
/// This is the shape that gets checkpointed: restoring a
/// [`Checkpoint`](crate::runtimes::Checkpoint) rebuilds exactly this.
#[derive(Debug, Clone)]
pub struct ThreadSession {
    /// The versioned state (messages and extra channels).
    pub state: AgentState,
    /// Superstep counter, 0 before the first step.
    pub step: u64,
    /// Nodes scheduled to run in the next superstep.
    pub frontier: Vec<NodeKind>,
}

impl ThreadSession {
    /// Terminal when there is nothing left to run.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.frontier.is_empty() || self.frontier.iter().all(|n| *n == NodeKind::End)
    }
}

/// How a thread came to exist in this executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInit {
    /// No prior history; the thread starts from step 0.
    Fresh,
    /// Restored from persistence.
    Resumed {
        /// The step the restored checkpoint was captured at.
        checkpoint_step: u64,
    },
}
