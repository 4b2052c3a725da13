use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError, NodeOutput, StateDelta};
use crate::state::StateSnapshot;
use crate::tools::ToolRegistry;

/// Prebuilt node that executes the tool calls pending on the last message.
///
/// Reads the tool calls from the most recent assistant message, invokes the
/// registry, and appends one answering tool message per call in call order.
/// Routing is left to the graph; pair this node with the
/// [`tools_condition`](crate::graphs::tools_condition) router so it only
/// runs when calls are actually pending.
pub struct ToolNode {
    registry: ToolRegistry,
}

impl ToolNode {
    #[must_use]
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let calls = snapshot.pending_tool_calls();
        if calls.is_empty() {
            return Err(NodeError::MissingInput {
                what: "pending tool calls on the last assistant message",
            });
        }
        ctx.emit("tools", format!("executing {} tool call(s)", calls.len()))?;

        let messages = self.registry.invoke_all(calls).await?;
        Ok(StateDelta::new().with_messages(messages).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::EventBus;
    use crate::message::{Message, Role, ToolCall};
    use crate::state::AgentState;
    use crate::tools::{Tool, ToolExecutionError, ToolSpec};
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        async fn call(&self, args: Value) -> Result<Value, ToolExecutionError> {
            let text = args["text"]
                .as_str()
                .ok_or_else(|| ToolExecutionError::new("missing text"))?;
            Ok(json!(text.to_uppercase()))
        }
    }

    // The bus must outlive the context or emits fail with a closed channel.
    fn ctx() -> (EventBus, NodeContext) {
        let bus = EventBus::default();
        let ctx = NodeContext {
            node_id: "tools".into(),
            step: 1,
            event_bus_sender: bus.get_sender(),
        };
        (bus, ctx)
    }

    #[tokio::test]
    async fn produces_ordered_tool_messages() {
        let registry = ToolRegistry::new().with_tool(
            ToolSpec::new("upper", "Uppercase text.", json!({"type": "object"})),
            Arc::new(Upper),
        );
        let node = ToolNode::new(registry);

        let calls = vec![
            ToolCall::new("c1", "upper", json!({"text": "ab"})),
            ToolCall::new("c2", "upper", json!({"text": "cd"})),
        ];
        let mut state = AgentState::new_with_user_message("shout");
        state.add_message(Message::assistant_with_tool_calls("", calls));

        let (_bus, ctx) = ctx();
        let output = node.run(state.snapshot(), ctx).await.unwrap();
        let messages = output.delta().messages.clone().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.role == Role::Tool));
        assert_eq!(messages[0].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(messages[1].content, "CD");
    }

    #[tokio::test]
    async fn missing_calls_is_fatal() {
        let node = ToolNode::new(ToolRegistry::new());
        let state = AgentState::new_with_user_message("no calls here");
        let (_bus, ctx) = ctx();
        let err = node.run(state.snapshot(), ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::MissingInput { .. }));
    }
}
