//! Runtime infrastructure: thread sessions, checkpointing, and the
//! superstep execution engine.
//!
//! The runtime layer is built around a few abstractions:
//!
//! - **[`GraphExecutor`]** - drives compiled graphs, one isolated session
//!   per thread id
//! - **[`Checkpointer`]** - pluggable persistence for thread history
//! - **[`ThreadSession`]** - in-memory execution state of one thread
//! - **Persistence models** - serde shapes for durable backends
//!
//! # Persistence backends
//!
//! - **[`InMemoryCheckpointer`]** - volatile, for tests and development
//! - **[`SQLiteCheckpointer`]** - durable SQLite-backed step history
//!
//! # Usage
//!
//! ```rust,no_run
//! use relaygraph::runtimes::GraphExecutor;
//! use relaygraph::state::AgentState;
//! # use relaygraph::graphs::Graph;
//! # async fn example(graph: Graph) -> Result<(), Box<dyn std::error::Error>> {
//! let mut executor = GraphExecutor::new(graph).await;
//! executor
//!     .create_thread("thread-1".into(), AgentState::new_with_user_message("Hello"))
//!     .await?;
//! let final_state = executor.run_until_complete("thread-1").await?;
//! # Ok(())
//! # }
//! ```

pub mod checkpointer;
#[cfg(feature = "sqlite")]
pub mod checkpointer_sqlite;
pub mod persistence;
pub mod runner;
pub mod runtime_config;
pub mod session;

pub use checkpointer::{
    restore_thread_session, Checkpoint, Checkpointer, CheckpointerError, CheckpointerType,
    InMemoryCheckpointer,
};
#[cfg(feature = "sqlite")]
pub use checkpointer_sqlite::SQLiteCheckpointer;
pub use persistence::{
    PersistedCheckpoint, PersistedMapChannel, PersistedState, PersistedVecChannel,
    PersistenceError,
};
pub use runner::{GraphExecutor, RunOutcome, RunnerError, StepReport};
pub use runtime_config::{
    EventBusConfig, RuntimeConfig, SinkConfig, DEFAULT_RECURSION_LIMIT,
};
pub use session::{SessionInit, ThreadSession};
