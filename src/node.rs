//! Node execution contract: the [`Node`] trait, execution context, partial
//! state updates, and fatal error taxonomy.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::control::Command;
use crate::event_bus::Event;
use crate::message::Message;
use crate::state::StateSnapshot;

/// Core trait for executable graph nodes.
///
/// A node is a pure step of computation: it reads the current
/// [`StateSnapshot`] and returns either a partial update ([`StateDelta`]) or
/// a [`Command`] that also overrides routing. Nodes never mutate shared
/// state directly; the runtime merges their outputs at a barrier.
///
/// # Error handling
///
/// Returning `Err(NodeError)` is fatal and stops the run. Recoverable
/// failures (a tool blowing up, a low-confidence result) belong in the
/// transcript as flagged messages, not in the error path.
///
/// # Examples
///
/// ```rust,no_run
/// use relaygraph::node::{Node, NodeContext, NodeError, NodeOutput, StateDelta};
/// use relaygraph::message::Message;
/// use relaygraph::state::StateSnapshot;
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Node for Echo {
///     async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
///         ctx.emit("echo", "running")?;
///         let last = snapshot
///             .last_message()
///             .ok_or(NodeError::MissingInput { what: "any message" })?;
///         let reply = Message::assistant(format!("you said: {}", last.content));
///         Ok(StateDelta::new().with_messages(vec![reply]).into())
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this node against the given snapshot.
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError>;
}

/// Execution context passed to nodes.
///
/// Carries the node's identity, the current step number, and a sender into
/// the run's event bus.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Identifier of the node instance being executed.
    pub node_id: String,
    /// Current superstep number.
    pub step: u64,
    /// Channel into the run's event system.
    pub event_bus_sender: flume::Sender<Event>,
}

impl NodeContext {
    /// Emit a node-scoped event tagged with this context's identity and step.
    pub fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), NodeContextError> {
        self.event_bus_sender
            .send(Event::node_message_with_meta(
                self.node_id.clone(),
                self.step,
                scope,
                message,
            ))
            .map_err(|_| NodeContextError::EventBusUnavailable)
    }
}

/// Partial state update returned by a node.
///
/// All fields are optional; an absent field means "no change". The runtime
/// applies deltas through the reducer registry: messages append in node
/// order, extras deep-merge with incoming keys winning.
///
/// # Examples
///
/// ```rust
/// use relaygraph::node::StateDelta;
/// use relaygraph::message::Message;
/// use relaygraph::utils::collections::new_extra_map;
/// use serde_json::json;
///
/// let mut extra = new_extra_map();
/// extra.insert("status".to_string(), json!("done"));
/// let delta = StateDelta::new()
///     .with_messages(vec![Message::assistant("Processing complete")])
///     .with_extra(extra);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    /// Messages to append to the conversation history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    /// Key-value data to deep-merge into the extra channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<FxHashMap<String, serde_json::Value>>,
}

impl StateDelta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages-only delta.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Attach extra data.
    #[must_use]
    pub fn with_extra(mut self, extra: FxHashMap<String, serde_json::Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    /// True when the delta changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.as_ref().is_none_or(Vec::is_empty)
            && self.extra.as_ref().is_none_or(FxHashMap::is_empty)
    }
}

/// What a node hands back: a plain update, or an update with routing intent.
#[derive(Clone, Debug)]
pub enum NodeOutput {
    /// Partial state update; routing follows the graph's edges.
    Delta(StateDelta),
    /// Update plus an explicit routing override.
    Command(Command),
}

impl NodeOutput {
    /// The delta carried by this output, whichever variant it is.
    #[must_use]
    pub fn delta(&self) -> &StateDelta {
        match self {
            NodeOutput::Delta(delta) => delta,
            NodeOutput::Command(command) => &command.update,
        }
    }
}

impl From<StateDelta> for NodeOutput {
    fn from(delta: StateDelta) -> Self {
        NodeOutput::Delta(delta)
    }
}

impl From<Command> for NodeOutput {
    fn from(command: Command) -> Self {
        NodeOutput::Command(command)
    }
}

/// Errors from [`NodeContext`] methods.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeContextError {
    /// Event could not be sent; the bus is disconnected or gone.
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(relaygraph::node::event_bus_unavailable),
        help("The event bus may be disconnected. Check that the run is still alive.")
    )]
    EventBusUnavailable,
}

/// Fatal node execution errors. These halt the run.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(relaygraph::node::missing_input),
        help("Check that the previous node produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// A model invocation failed. Unlike tool failures, these are fatal.
    #[error("model invocation failed ({provider}): {message}")]
    #[diagnostic(code(relaygraph::node::model))]
    Model {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(relaygraph::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(relaygraph::node::validation),
        help("Check input data format and required fields.")
    )]
    ValidationFailed(String),

    /// A nested graph run failed.
    #[error("subgraph {name} failed: {message}")]
    #[diagnostic(code(relaygraph::node::subgraph))]
    Subgraph { name: String, message: String },

    /// Structural tool error (unknown or misregistered tool).
    #[error(transparent)]
    #[diagnostic(transparent)]
    Tool(#[from] crate::tools::ToolError),

    /// Event bus communication error.
    #[error("event bus error: {0}")]
    #[diagnostic(code(relaygraph::node::event_bus))]
    EventBus(#[from] NodeContextError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Command;

    #[test]
    fn empty_delta_reports_empty() {
        assert!(StateDelta::new().is_empty());
        assert!(StateDelta::new().with_messages(vec![]).is_empty());
        let delta = StateDelta::new().with_messages(vec![Message::assistant("hi")]);
        assert!(!delta.is_empty());
    }

    #[test]
    fn output_delta_accessor_reaches_command_update() {
        let update = StateDelta::new().with_messages(vec![Message::assistant("jump")]);
        let output: NodeOutput = Command::goto("next").with_update(update).into();
        assert_eq!(output.delta().messages.as_ref().map(Vec::len), Some(1));
    }
}
