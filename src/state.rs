//! Run state: versioned channels plus immutable snapshots.
//!
//! State is organized into two channels:
//! - **messages**: append-only conversation history
//! - **extra**: key-value scratch space, deep-merged across steps
//!
//! Nodes never touch [`AgentState`] directly; they receive a cloned
//! [`StateSnapshot`] and hand partial updates back to the runtime, which
//! merges them at a barrier.
//!
//! # Examples
//!
//! ```rust
//! use relaygraph::state::AgentState;
//! use relaygraph::channels::Channel;
//! use serde_json::json;
//!
//! let mut state = AgentState::new_with_user_message("Hello, world!");
//! state.add_extra("user_id", json!("user123"));
//!
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.messages.len(), 1);
//! assert_eq!(snapshot.extra.get("user_id"), Some(&json!("user123")));
//! ```

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::{
    channels::{Channel, ExtrasChannel, MessagesChannel},
    message::{Message, Role, ToolCall},
};

/// The state container for a single thread of execution.
///
/// Owns the versioned channels. Construct one with
/// [`new_with_user_message`](Self::new_with_user_message),
/// [`new_with_messages`](Self::new_with_messages), the [`builder`](Self::builder),
/// or [`empty`](Self::empty) for a fresh thread.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentState {
    /// Append-only conversation history.
    pub messages: MessagesChannel,
    /// Scratch space for custom metadata and intermediate results.
    pub extra: ExtrasChannel,
}

/// Immutable view of state at a specific point in time.
///
/// Snapshots are created by [`AgentState::snapshot`] and passed to nodes and
/// routers. They are plain clones: mutating the original state afterwards
/// does not affect a snapshot already taken.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Messages at the time of snapshot.
    pub messages: Vec<Message>,
    /// Version of the messages channel when the snapshot was taken.
    pub messages_version: u32,
    /// Extra data at the time of snapshot.
    pub extra: FxHashMap<String, Value>,
    /// Version of the extra channel when the snapshot was taken.
    pub extra_version: u32,
}

impl StateSnapshot {
    /// The most recent message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Tool calls pending on the most recent message. Empty unless the last
    /// message is an assistant message that requested tools.
    #[must_use]
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        match self.last_message() {
            Some(m) if m.wants_tools() => &m.tool_calls,
            _ => &[],
        }
    }
}

impl AgentState {
    /// An empty state: no messages, no extras, all channels at version 1.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            messages: MessagesChannel::default(),
            extra: ExtrasChannel::default(),
        }
    }

    /// Creates a state holding a single user message.
    ///
    /// ```rust
    /// use relaygraph::state::AgentState;
    /// use relaygraph::message::Role;
    ///
    /// let state = AgentState::new_with_user_message("Analyze this data");
    /// let snapshot = state.snapshot();
    /// assert_eq!(snapshot.messages[0].role, Role::User);
    /// assert_eq!(snapshot.messages_version, 1);
    /// ```
    #[must_use]
    pub fn new_with_user_message(user_text: &str) -> Self {
        Self::new_with_messages(vec![Message::user(user_text)])
    }

    /// Creates a state from an existing transcript.
    #[must_use]
    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: MessagesChannel::new(messages, 1),
            extra: ExtrasChannel::default(),
        }
    }

    /// Fluent builder for states with mixed messages and extras.
    ///
    /// ```rust
    /// use relaygraph::state::AgentState;
    /// use serde_json::json;
    ///
    /// let state = AgentState::builder()
    ///     .with_system_message("You are terse.")
    ///     .with_user_message("Hello!")
    ///     .with_extra("session", json!("s1"))
    ///     .build();
    /// assert_eq!(state.snapshot().messages.len(), 2);
    /// ```
    #[must_use]
    pub fn builder() -> AgentStateBuilder {
        AgentStateBuilder::default()
    }

    /// Appends a message. The version is not bumped here; the barrier owns
    /// version changes.
    pub fn add_message(&mut self, message: Message) -> &mut Self {
        self.messages.get_mut().push(message);
        self
    }

    /// Inserts a key into the extra channel. Same versioning rule as
    /// [`add_message`](Self::add_message).
    pub fn add_extra(&mut self, key: &str, value: Value) -> &mut Self {
        self.extra.get_mut().insert(key.to_string(), value);
        self
    }

    /// Clones the channels into an immutable [`StateSnapshot`].
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            messages: self.messages.snapshot(),
            messages_version: self.messages.version(),
            extra: self.extra.snapshot(),
            extra_version: self.extra.version(),
        }
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builder returned by [`AgentState::builder`].
#[derive(Debug, Default)]
pub struct AgentStateBuilder {
    messages: Vec<Message>,
    extra: FxHashMap<String, Value>,
}

impl AgentStateBuilder {
    #[must_use]
    pub fn with_user_message(mut self, content: &str) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    #[must_use]
    pub fn with_assistant_message(mut self, content: &str) -> Self {
        self.messages.push(Message::assistant(content));
        self
    }

    #[must_use]
    pub fn with_system_message(mut self, content: &str) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    #[must_use]
    pub fn with_message(mut self, role: Role, content: &str) -> Self {
        self.messages.push(Message::new(role, content));
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn build(self) -> AgentState {
        AgentState {
            messages: MessagesChannel::new(self.messages, 1),
            extra: ExtrasChannel::new(self.extra, 1),
        }
    }
}
