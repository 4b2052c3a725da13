//! The ReAct loop: a model node, a tool node, and the conditional edge
//! between them.

use async_trait::async_trait;
use std::sync::Arc;

use crate::clients::{ChatModel, ToolChoice};
use crate::graphs::{tools_condition, tools_route_table, Graph, GraphBuildError, GraphBuilder};
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodeOutput, StateDelta};
use crate::state::StateSnapshot;
use crate::tools::{ToolNode, ToolRegistry, ToolSpec};
use crate::types::NodeKind;

/// Model step of an agent loop: binds the registered tool specs and
/// appends the model's reply (which may carry tool calls) to the
/// transcript.
pub struct ModelNode {
    model: Arc<dyn ChatModel>,
    specs: Vec<ToolSpec>,
    system_prompt: Option<String>,
}

impl ModelNode {
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>, specs: Vec<ToolSpec>) -> Self {
        Self {
            model,
            specs,
            system_prompt: None,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[async_trait]
impl Node for ModelNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let mut messages = Vec::with_capacity(snapshot.messages.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt));
        }
        messages.extend(snapshot.messages.iter().cloned());

        let reply = self
            .model
            .invoke(&messages, &self.specs, ToolChoice::Auto)
            .await
            .map_err(|e| NodeError::Model {
                provider: e.provider,
                message: e.message,
            })?;

        if reply.wants_tools() {
            ctx.emit(
                "model",
                format!("requested {} tool call(s)", reply.tool_calls.len()),
            )?;
        }
        Ok(StateDelta::new().with_messages(vec![reply]).into())
    }
}

/// Assembles the canonical tool-calling agent.
///
/// Topology: `Start -> model`, then [`tools_condition`] routes pending
/// tool calls to the tool node and everything else to End; the tool node
/// loops back to the model with its results.
///
/// ```text
/// Start -> model --use-tools--> tools
///            ^                    |
///            |____________________|
///            '---done--> End
/// ```
pub fn create_react_agent(
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    system_prompt: Option<String>,
) -> Result<Graph, GraphBuildError> {
    let mut model_node = ModelNode::new(model, tools.specs());
    if let Some(prompt) = system_prompt {
        model_node = model_node.with_system_prompt(prompt);
    }

    GraphBuilder::new()
        .add_node("model", model_node)
        .add_node("tools", ToolNode::new(tools))
        .add_edge(NodeKind::Start, "model")
        .add_conditional_edge("model", tools_condition(), tools_route_table("tools"))
        .add_edge("tools", "model")
        .compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ModelError;
    use crate::message::ToolCall;
    use crate::state::AgentState;
    use crate::tools::{Tool, ToolExecutionError};
    use serde_json::{json, Value};

    /// Calls the add tool once, then answers with the result it saw.
    struct OneShotToolUser;

    #[async_trait]
    impl ChatModel for OneShotToolUser {
        async fn invoke(
            &self,
            messages: &[Message],
            _tools: &[ToolSpec],
            _tool_choice: ToolChoice,
        ) -> Result<Message, ModelError> {
            let already_called = messages.iter().any(|m| m.role == crate::message::Role::Tool);
            if already_called {
                let result = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == crate::message::Role::Tool)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                Ok(Message::assistant(format!("The answer is {result}")))
            } else {
                Ok(Message::assistant_with_tool_calls(
                    "",
                    vec![ToolCall::new("c1", "add", json!({"a": 3, "b": 5}))],
                ))
            }
        }
    }

    struct Add;

    #[async_trait]
    impl Tool for Add {
        async fn call(&self, args: Value) -> Result<Value, ToolExecutionError> {
            let a = args["a"].as_i64().unwrap_or(0);
            let b = args["b"].as_i64().unwrap_or(0);
            Ok(json!(a + b))
        }
    }

    #[tokio::test]
    async fn react_loop_runs_tool_then_answers() {
        let registry = ToolRegistry::new().with_tool(
            ToolSpec::new("add", "Add two integers.", json!({"type": "object"})),
            Arc::new(Add),
        );
        let graph = create_react_agent(Arc::new(OneShotToolUser), registry, None).unwrap();

        let final_state = graph
            .invoke(AgentState::new_with_user_message("what is 3 + 5?"))
            .await
            .unwrap();

        let snapshot = final_state.snapshot();
        let last = snapshot.last_message().unwrap();
        assert_eq!(last.content, "The answer is 8");
        // user, assistant(call), tool(result), assistant(answer)
        assert_eq!(snapshot.messages.len(), 4);
    }

    #[tokio::test]
    async fn zero_tool_calls_goes_straight_to_end() {
        struct Direct;

        #[async_trait]
        impl ChatModel for Direct {
            async fn invoke(
                &self,
                _: &[Message],
                _: &[ToolSpec],
                _: ToolChoice,
            ) -> Result<Message, ModelError> {
                Ok(Message::assistant("No tools needed."))
            }
        }

        let graph = create_react_agent(Arc::new(Direct), ToolRegistry::new(), None).unwrap();
        let final_state = graph
            .invoke(AgentState::new_with_user_message("hello"))
            .await
            .unwrap();
        assert_eq!(final_state.snapshot().messages.len(), 2);
    }
}
