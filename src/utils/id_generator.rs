//! Thread and run id generation.

use uuid::Uuid;

/// Generates ids for threads and runs when the caller does not supply one.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// A fresh thread id, e.g. `thread-3f9a...`.
    #[must_use]
    pub fn generate_thread_id(&self) -> String {
        format!("thread-{}", Uuid::new_v4().simple())
    }

    /// A fresh run id, e.g. `run-5c02...`.
    #[must_use]
    pub fn generate_run_id(&self) -> String {
        format!("run-{}", Uuid::new_v4().simple())
    }
}
