//! Hand-off primitives: the `transfer_to_*` tool convention and the
//! commands that realize a transfer.
//!
//! A routing agent is given one hand-off tool per target agent. When the
//! model calls `transfer_to_research`, the agent node answers the call with
//! an acknowledgement tool message (keeping the transcript's call/response
//! pairing intact) and returns a [`Command`] that jumps to the target.

use serde_json::json;

use crate::control::{Command, Send};
use crate::message::{Message, ToolCall};
use crate::node::StateDelta;
use crate::tools::ToolSpec;
use crate::types::NodeKind;

/// The tool name that transfers control to `agent`.
#[must_use]
pub fn handoff_tool_name(agent: &str) -> String {
    format!("transfer_to_{agent}")
}

/// Spec for a hand-off tool. Takes no arguments; the decision is the call
/// itself.
#[must_use]
pub fn handoff_tool_spec(agent: &str, description: impl Into<String>) -> ToolSpec {
    ToolSpec::new(
        handoff_tool_name(agent),
        description,
        json!({"type": "object", "properties": {}}),
    )
}

/// Transfer control to `agent`, answering the triggering tool call.
///
/// The update pairs the pending call with an acknowledgement tool message;
/// the command then jumps to the agent node. The target sees the full
/// shared transcript.
#[must_use]
pub fn handoff_command(agent: impl Into<NodeKind>, call: &ToolCall) -> Command {
    let agent = agent.into();
    let ack = Message::tool(
        format!("Successfully transferred to {agent}"),
        &call.id,
        &call.name,
    );
    Command::goto(agent).with_update(StateDelta::new().with_messages(vec![ack]))
}

/// Fire-and-forget delegation: dispatch `agent` with only a task
/// description instead of the shared transcript.
///
/// The caller's transcript gets the acknowledgement; the worker gets a
/// private state holding just the task. Results land back in the shared
/// state when the dispatch joins.
#[must_use]
pub fn delegate_task(agent: impl Into<NodeKind>, task_description: &str, call: &ToolCall) -> Command {
    let agent = agent.into();
    let ack = Message::tool(
        format!("Delegated to {agent}: {task_description}"),
        &call.id,
        &call.name,
    );
    Command::fan_out(vec![Send::with_task(agent, task_description)])
        .with_update(StateDelta::new().with_messages(vec![ack]))
}
