use async_trait::async_trait;

use crate::channels::Channel;
use crate::control::CommandScope;
use crate::graphs::Graph;
use crate::node::{Node, NodeContext, NodeError, NodeOutput, StateDelta};
use crate::runtimes::{GraphExecutor, RunOutcome};
use crate::state::{AgentState, StateSnapshot};
use crate::utils::collections::new_extra_map;

/// Wraps a compiled [`Graph`] so it can run as a single node of an
/// enclosing graph.
///
/// The inner graph runs to completion against the outer snapshot; whatever
/// it appended (messages and extra keys) comes back as this node's delta.
/// If an inner node issues a parent-scoped command, the inner run stops and
/// the command is re-emitted here, rescoped to the enclosing graph. That is
/// the whole escape mechanism: one level per subgraph boundary.
pub struct SubgraphNode {
    name: String,
    graph: Graph,
}

impl SubgraphNode {
    #[must_use]
    pub fn new(name: impl Into<String>, graph: Graph) -> Self {
        Self {
            name: name.into(),
            graph,
        }
    }

    /// Messages and extras the inner run added on top of its input.
    fn delta_since(input: &StateSnapshot, final_state: &AgentState) -> StateDelta {
        let all_messages = final_state.messages.snapshot();
        let new_messages: Vec<_> = all_messages
            .into_iter()
            .skip(input.messages.len())
            .collect();
        let extra = final_state.extra.snapshot();

        let mut delta = StateDelta::new();
        if !new_messages.is_empty() {
            delta = delta.with_messages(new_messages);
        }
        if !extra.is_empty() {
            let mut map = new_extra_map();
            map.extend(extra);
            delta = delta.with_extra(map);
        }
        delta
    }
}

#[async_trait]
impl Node for SubgraphNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        ctx.emit("subgraph", format!("entering {}", self.name))?;

        let mut inner_state = AgentState::new_with_messages(snapshot.messages.clone());
        for (key, value) in &snapshot.extra {
            inner_state.add_extra(key, value.clone());
        }

        let mut executor = GraphExecutor::with_options(self.graph.clone(), false).await;
        let thread_id = format!("{}-step{}", self.name, ctx.step);
        executor
            .create_thread(thread_id.clone(), inner_state)
            .await
            .map_err(|e| NodeError::Subgraph {
                name: self.name.clone(),
                message: e.to_string(),
            })?;

        match executor.run_to_outcome(&thread_id).await {
            Ok(RunOutcome::Completed(final_state)) => {
                ctx.emit("subgraph", format!("{} completed", self.name))?;
                Ok(Self::delta_since(&snapshot, &final_state).into())
            }
            Ok(RunOutcome::ParentCommand {
                state,
                command,
                origin,
            }) => {
                // One level of escape: the command addressed our parent, so
                // hand it up rescoped as our own local output. Its update
                // already landed in the inner state; carry the accumulated
                // delta so the outer barrier sees it too.
                debug_assert_eq!(command.scope, CommandScope::Parent);
                ctx.emit(
                    "subgraph",
                    format!("{} escalated a command from {origin}", self.name),
                )?;
                let delta = Self::delta_since(&snapshot, &state);
                Ok(command.into_local().with_update(delta).into())
            }
            Err(e) => Err(NodeError::Subgraph {
                name: self.name.clone(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::EventBus;
    use crate::graphs::GraphBuilder;
    use crate::message::Message;
    use crate::types::NodeKind;

    struct Greet;

    #[async_trait]
    impl Node for Greet {
        async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeOutput, NodeError> {
            Ok(StateDelta::new()
                .with_messages(vec![Message::assistant("hello from inside")])
                .into())
        }
    }

    struct Escalator;

    #[async_trait]
    impl Node for Escalator {
        async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeOutput, NodeError> {
            Ok(crate::control::Command::goto("elsewhere").in_parent().into())
        }
    }

    // The bus must outlive the context or emits fail with a closed channel.
    fn ctx() -> (EventBus, NodeContext) {
        let bus = EventBus::default();
        let ctx = NodeContext {
            node_id: "subgraph".into(),
            step: 1,
            event_bus_sender: bus.get_sender(),
        };
        (bus, ctx)
    }

    #[tokio::test]
    async fn completed_inner_run_surfaces_only_new_messages() {
        let inner = GraphBuilder::new()
            .add_node("greet", Greet)
            .add_edge(NodeKind::Start, "greet")
            .add_edge("greet", NodeKind::End)
            .compile()
            .unwrap();
        let node = SubgraphNode::new("greeter", inner);

        let state = AgentState::new_with_user_message("hi");
        let (_bus, ctx) = ctx();
        let output = node.run(state.snapshot(), ctx).await.unwrap();
        let messages = output.delta().messages.clone().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello from inside");
    }

    #[tokio::test]
    async fn parent_command_escapes_exactly_one_level() {
        let inner = GraphBuilder::new()
            .add_node("escalator", Escalator)
            .add_edge(NodeKind::Start, "escalator")
            .compile()
            .unwrap();
        let node = SubgraphNode::new("wrapper", inner);

        let state = AgentState::new_with_user_message("go");
        let (_bus, ctx) = ctx();
        let output = node.run(state.snapshot(), ctx).await.unwrap();
        match output {
            NodeOutput::Command(cmd) => {
                assert_eq!(cmd.scope, CommandScope::Local);
                assert!(
                    matches!(cmd.goto, crate::control::Goto::Node(ref k) if *k == NodeKind::Custom("elsewhere".into()))
                );
            }
            NodeOutput::Delta(_) => panic!("expected an escalated command"),
        }
    }
}
