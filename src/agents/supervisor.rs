//! The supervisor pattern: a routing model that hands work to specialist
//! agents and collects control back after each one finishes.

use async_trait::async_trait;
use std::sync::Arc;

use crate::clients::{ChatModel, ToolChoice};
use crate::graphs::{Graph, GraphBuildError, GraphBuilder};
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodeOutput, StateDelta};
use crate::state::StateSnapshot;
use crate::types::NodeKind;

use super::handoff::{handoff_command, handoff_tool_name, handoff_tool_spec};
use super::subgraph::SubgraphNode;

/// A specialist agent managed by a supervisor.
pub struct Worker {
    /// Node name the supervisor transfers to.
    pub name: String,
    /// What this worker is for, shown to the routing model.
    pub description: String,
    /// The worker's own compiled graph.
    pub graph: Graph,
}

impl Worker {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, graph: Graph) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            graph,
        }
    }
}

/// Hub node of a supervisor graph.
///
/// On each turn the model sees the shared transcript plus one hand-off
/// tool per worker. A `transfer_to_*` call becomes a [`handoff_command`]
/// jump to that worker; a reply with no tool calls means the supervisor is
/// satisfied and the run ends.
pub struct SupervisorNode {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    workers: Vec<String>,
    specs: Vec<crate::tools::ToolSpec>,
}

impl SupervisorNode {
    #[must_use]
    pub fn new(
        model: Arc<dyn ChatModel>,
        system_prompt: impl Into<String>,
        workers: &[(String, String)],
    ) -> Self {
        let specs = workers
            .iter()
            .map(|(name, description)| handoff_tool_spec(name, description.clone()))
            .collect();
        Self {
            model,
            system_prompt: system_prompt.into(),
            workers: workers.iter().map(|(name, _)| name.clone()).collect(),
            specs,
        }
    }

    fn worker_for_call(&self, tool_name: &str) -> Option<&str> {
        self.workers
            .iter()
            .find(|w| handoff_tool_name(w) == tool_name)
            .map(String::as_str)
    }
}

#[async_trait]
impl Node for SupervisorNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let mut messages = vec![Message::system(&self.system_prompt)];
        messages.extend(snapshot.messages.iter().cloned());

        let reply = self
            .model
            .invoke(&messages, &self.specs, ToolChoice::Auto)
            .await
            .map_err(|e| NodeError::Model {
                provider: e.provider,
                message: e.message,
            })?;

        let Some(call) = reply.tool_calls.first().cloned() else {
            // No transfer requested: the supervisor's answer is final.
            ctx.emit("supervisor", "no hand-off, ending run")?;
            return Ok(crate::control::Command::end()
                .with_update(StateDelta::new().with_messages(vec![reply]))
                .into());
        };

        let Some(worker) = self.worker_for_call(&call.name) else {
            return Err(NodeError::ValidationFailed(format!(
                "supervisor called unknown hand-off tool {:?}",
                call.name
            )));
        };
        ctx.emit("supervisor", format!("transferring to {worker}"))?;

        // The model's reply (carrying the call) goes first, then the
        // acknowledgement from the hand-off, then the jump.
        let command = handoff_command(worker, &call);
        let mut update_messages = vec![reply];
        update_messages.extend(command.update.messages.clone().unwrap_or_default());
        Ok(command
            .with_update(StateDelta::new().with_messages(update_messages))
            .into())
    }
}

/// Assembles the hub-and-spoke supervisor topology.
///
/// Each worker graph is wrapped in a [`SubgraphNode`] with a static edge
/// back to the supervisor, so control always returns to the hub after a
/// worker finishes.
pub fn supervisor_graph(
    model: Arc<dyn ChatModel>,
    system_prompt: impl Into<String>,
    workers: Vec<Worker>,
) -> Result<Graph, GraphBuildError> {
    let descriptors: Vec<(String, String)> = workers
        .iter()
        .map(|w| (w.name.clone(), w.description.clone()))
        .collect();

    let mut builder = GraphBuilder::new()
        .add_node(
            "supervisor",
            SupervisorNode::new(model, system_prompt, &descriptors),
        )
        .add_edge(NodeKind::Start, "supervisor");

    for worker in workers {
        let name = worker.name.clone();
        builder = builder
            .add_node(name.as_str(), SubgraphNode::new(name.clone(), worker.graph))
            .add_edge(name.as_str(), "supervisor");
    }

    builder.compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ModelError, ToolChoice};
    use crate::control::Goto;
    use crate::event_bus::EventBus;
    use crate::message::ToolCall;
    use crate::state::AgentState;
    use crate::tools::ToolSpec;
    use serde_json::json;

    /// Scripted model: returns canned replies in order.
    struct Scripted {
        replies: std::sync::Mutex<Vec<Message>>,
    }

    impl Scripted {
        fn new(replies: Vec<Message>) -> Self {
            Self {
                replies: std::sync::Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl ChatModel for Scripted {
        async fn invoke(
            &self,
            _messages: &[Message],
            _tools: &[ToolSpec],
            _tool_choice: ToolChoice,
        ) -> Result<Message, ModelError> {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(ModelError::new("scripted", "no replies left"));
            }
            Ok(replies.remove(0))
        }
    }

    // The bus must outlive the context or emits fail with a closed channel.
    fn ctx() -> (EventBus, NodeContext) {
        let bus = EventBus::default();
        let ctx = NodeContext {
            node_id: "supervisor".into(),
            step: 1,
            event_bus_sender: bus.get_sender(),
        };
        (bus, ctx)
    }

    #[tokio::test]
    async fn handoff_call_becomes_goto_command() {
        let call = ToolCall::new("c1", handoff_tool_name("research"), json!({}));
        let model = Arc::new(Scripted::new(vec![Message::assistant_with_tool_calls(
            "",
            vec![call],
        )]));
        let node = SupervisorNode::new(
            model,
            "You route work.",
            &[("research".to_string(), "Finds facts.".to_string())],
        );

        let state = AgentState::new_with_user_message("who won in 2022?");
        let (_bus, ctx) = ctx();
        let output = node.run(state.snapshot(), ctx).await.unwrap();
        match output {
            NodeOutput::Command(cmd) => {
                assert!(
                    matches!(cmd.goto, Goto::Node(ref k) if *k == NodeKind::Custom("research".into()))
                );
                // assistant reply with the call, then the tool ack
                let messages = cmd.update.messages.unwrap();
                assert_eq!(messages.len(), 2);
                assert_eq!(messages[1].tool_call_id.as_deref(), Some("c1"));
            }
            NodeOutput::Delta(_) => panic!("expected a command"),
        }
    }

    #[tokio::test]
    async fn reply_without_calls_ends_the_run() {
        let model = Arc::new(Scripted::new(vec![Message::assistant("All done.")]));
        let node = SupervisorNode::new(
            model,
            "You route work.",
            &[("research".to_string(), "Finds facts.".to_string())],
        );

        let state = AgentState::new_with_user_message("thanks!");
        let (_bus, ctx) = ctx();
        let output = node.run(state.snapshot(), ctx).await.unwrap();
        match output {
            NodeOutput::Command(cmd) => assert!(matches!(cmd.goto, Goto::End)),
            NodeOutput::Delta(_) => panic!("expected an end command"),
        }
    }

    #[tokio::test]
    async fn unknown_handoff_tool_is_fatal() {
        let call = ToolCall::new("c1", "transfer_to_nowhere", json!({}));
        let model = Arc::new(Scripted::new(vec![Message::assistant_with_tool_calls(
            "",
            vec![call],
        )]));
        let node = SupervisorNode::new(
            model,
            "You route work.",
            &[("research".to_string(), "Finds facts.".to_string())],
        );

        let state = AgentState::new_with_user_message("hm");
        let (_bus, ctx) = ctx();
        let err = node.run(state.snapshot(), ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::ValidationFailed(_)));
    }
}
