//! Control-flow values nodes can return to override static routing.
//!
//! A [`Command`] bundles a state update with an explicit routing decision.
//! The update is applied at the barrier *before* routing takes effect, so a
//! jump never loses the messages that motivated it.

use crate::message::Message;
use crate::node::StateDelta;
use crate::state::AgentState;
use crate::types::NodeKind;

/// Which graph a command's routing applies to.
///
/// `Parent` commands escape exactly one level: a subgraph node stops its
/// inner run and re-emits the command (rescoped to `Local`) as its own
/// output in the enclosing graph. At the top level a `Parent` command is a
/// structural error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandScope {
    /// Route within the graph that ran this node.
    Local,
    /// Route within the enclosing graph.
    Parent,
}

/// One dispatch of a fan-out: run `node` with its own private state.
///
/// The target sees only the state handed to it here, not the caller's
/// transcript. Used for fire-and-forget delegation where a worker gets a
/// task description instead of the full history.
#[derive(Clone, Debug)]
pub struct Send {
    /// Target node (often a subgraph-wrapped agent).
    pub node: NodeKind,
    /// Private state for this dispatch.
    pub state: AgentState,
}

impl Send {
    #[must_use]
    pub fn new(node: impl Into<NodeKind>, state: AgentState) -> Self {
        Self {
            node: node.into(),
            state,
        }
    }

    /// Dispatch carrying a single task-description message, the minimal
    /// state a delegated worker needs.
    #[must_use]
    pub fn with_task(node: impl Into<NodeKind>, task_description: &str) -> Self {
        Self::new(
            node,
            AgentState::new_with_messages(vec![Message::user(task_description)]),
        )
    }
}

/// Routing decision carried by a [`Command`].
#[derive(Clone, Debug)]
pub enum Goto {
    /// Jump to a named node, replacing whatever the static or conditional
    /// edges would have chosen.
    Node(NodeKind),
    /// Finish the run.
    End,
    /// Dispatch every [`Send`] with its own state; the runtime joins them
    /// all before the run continues.
    FanOut(Vec<Send>),
}

/// A state update plus an explicit routing decision.
///
/// # Examples
///
/// ```rust
/// use relaygraph::control::Command;
/// use relaygraph::message::Message;
/// use relaygraph::node::StateDelta;
///
/// let cmd = Command::goto("escalation")
///     .with_update(StateDelta::new().with_messages(vec![Message::assistant("Escalating.")]));
/// ```
#[derive(Clone, Debug)]
pub struct Command {
    /// Applied at the barrier before routing takes effect.
    pub update: StateDelta,
    /// Where to go next.
    pub goto: Goto,
    /// Which graph the routing applies to.
    pub scope: CommandScope,
}

impl Command {
    /// Jump to a named node.
    #[must_use]
    pub fn goto(node: impl Into<NodeKind>) -> Self {
        Self {
            update: StateDelta::new(),
            goto: Goto::Node(node.into()),
            scope: CommandScope::Local,
        }
    }

    /// Finish the run.
    #[must_use]
    pub fn end() -> Self {
        Self {
            update: StateDelta::new(),
            goto: Goto::End,
            scope: CommandScope::Local,
        }
    }

    /// Fan out to several targets, each with its own state.
    #[must_use]
    pub fn fan_out(sends: Vec<Send>) -> Self {
        Self {
            update: StateDelta::new(),
            goto: Goto::FanOut(sends),
            scope: CommandScope::Local,
        }
    }

    /// Attach a state update.
    #[must_use]
    pub fn with_update(mut self, update: StateDelta) -> Self {
        self.update = update;
        self
    }

    /// Mark the command as addressed to the enclosing graph.
    #[must_use]
    pub fn in_parent(mut self) -> Self {
        self.scope = CommandScope::Parent;
        self
    }

    /// Rescope a parent command for the graph it just escaped into.
    #[must_use]
    pub fn into_local(mut self) -> Self {
        self.scope = CommandScope::Local;
        self
    }
}
