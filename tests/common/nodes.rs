#![allow(dead_code)]

use async_trait::async_trait;
use relaygraph::control::Command;
use relaygraph::message::Message;
use relaygraph::node::{Node, NodeContext, NodeError, NodeOutput, StateDelta};
use relaygraph::state::StateSnapshot;
use relaygraph::utils::collections::new_extra_map;
use serde_json::Value;

/// Appends one fixed assistant message per run.
#[derive(Debug, Clone)]
pub struct SimpleMessageNode {
    pub msg: &'static str,
}

impl SimpleMessageNode {
    pub fn new(msg: &'static str) -> Self {
        Self { msg }
    }
}

#[async_trait]
impl Node for SimpleMessageNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        Ok(StateDelta::new()
            .with_messages(vec![Message::assistant(self.msg)])
            .into())
    }
}

/// Changes nothing.
#[derive(Debug, Clone)]
pub struct NoopNode;

#[async_trait]
impl Node for NoopNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        Ok(StateDelta::new().into())
    }
}

/// Writes one extra key per run.
#[derive(Debug, Clone)]
pub struct ExtraWriterNode {
    pub key: &'static str,
    pub value: Value,
}

#[async_trait]
impl Node for ExtraWriterNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let mut extra = new_extra_map();
        extra.insert(self.key.to_string(), self.value.clone());
        Ok(StateDelta::new().with_extra(extra).into())
    }
}

/// Returns a fixed command, for routing tests.
pub struct CommandNode {
    pub command: Command,
}

#[async_trait]
impl Node for CommandNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        Ok(self.command.clone().into())
    }
}

/// Echoes the first user message back, prefixed. Used to prove which
/// transcript a node actually saw.
#[derive(Debug, Clone)]
pub struct EchoFirstUserNode;

#[async_trait]
impl Node for EchoFirstUserNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let first = snapshot
            .messages
            .iter()
            .find(|m| m.role == relaygraph::message::Role::User)
            .ok_or(NodeError::MissingInput {
                what: "a user message",
            })?;
        Ok(StateDelta::new()
            .with_messages(vec![Message::assistant(format!("echo: {}", first.content))])
            .into())
    }
}

/// Always fails, for fatal-error propagation tests.
#[derive(Debug, Clone)]
pub struct FailingNode;

#[async_trait]
impl Node for FailingNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        Err(NodeError::ValidationFailed("deliberate failure".into()))
    }
}
