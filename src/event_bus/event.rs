use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::node::StateDelta;

/// Scope label of the diagnostic event emitted when a run's event stream is
/// complete. Stream consumers can use it as an end-of-stream marker.
pub const STREAM_END_SCOPE: &str = "__relaygraph_stream_end__";

/// An observable event produced during a run.
///
/// - `Node`: free-form messages emitted by nodes via their context.
/// - `Diagnostic`: runtime-internal notices (session lifecycle, stream end).
/// - `Update`: one per completed node per barrier, carrying the delta that
///   node contributed. This is the streaming surface of the runtime.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Event {
    Node(NodeEvent),
    Diagnostic(DiagnosticEvent),
    Update(UpdateEvent),
}

impl Event {
    pub fn node_message(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Node(NodeEvent::new(None, None, scope.into(), message.into()))
    }

    pub fn node_message_with_meta(
        node_id: impl Into<String>,
        step: u64,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Event::Node(NodeEvent::new(
            Some(node_id.into()),
            Some(step),
            scope.into(),
            message.into(),
        ))
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn update(node: impl Into<String>, step: u64, delta: StateDelta) -> Self {
        Event::Update(UpdateEvent {
            node: node.into(),
            step,
            delta,
        })
    }

    pub fn scope_label(&self) -> Option<&str> {
        match self {
            Event::Node(node) => Some(node.scope()),
            Event::Diagnostic(diag) => Some(diag.scope()),
            Event::Update(_) => Some("update"),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Event::Node(node) => node.message(),
            Event::Diagnostic(diag) => diag.message(),
            Event::Update(update) => &update.node,
        }
    }

    /// Convert to a structured JSON value with a normalized schema:
    ///
    /// ```json
    /// {
    ///   "type": "node" | "diagnostic" | "update",
    ///   "scope": "scope_label",
    ///   "message": "event_message",
    ///   "timestamp": "2026-08-30T12:34:56.789Z",
    ///   "metadata": { }
    /// }
    /// ```
    pub fn to_json_value(&self) -> Value {
        use serde_json::json;

        let (event_type, metadata) = match self {
            Event::Node(node) => {
                let mut meta = serde_json::Map::new();
                if let Some(node_id) = node.node_id() {
                    meta.insert("node_id".to_string(), json!(node_id));
                }
                if let Some(step) = node.step() {
                    meta.insert("step".to_string(), json!(step));
                }
                ("node", Value::Object(meta))
            }
            Event::Diagnostic(_) => ("diagnostic", Value::Object(serde_json::Map::new())),
            Event::Update(update) => {
                let mut meta = serde_json::Map::new();
                meta.insert("node".to_string(), json!(update.node));
                meta.insert("step".to_string(), json!(update.step));
                meta.insert(
                    "delta".to_string(),
                    serde_json::to_value(&update.delta).unwrap_or(Value::Null),
                );
                ("update", Value::Object(meta))
            }
        };

        json!({
            "type": event_type,
            "scope": self.scope_label(),
            "message": self.message(),
            "timestamp": Utc::now().to_rfc3339(),
            "metadata": metadata,
        })
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_json_value())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Node(node) => match (node.node_id(), node.step()) {
                (Some(id), Some(step)) => write!(f, "[{id}@{step}] {}", node.message()),
                (Some(id), None) => write!(f, "[{id}] {}", node.message()),
                (None, Some(step)) => write!(f, "[step {step}] {}", node.message()),
                (None, None) => write!(f, "{}", node.message()),
            },
            Event::Diagnostic(diag) => write!(f, "{}", diag.message()),
            Event::Update(update) => {
                let added = update
                    .delta
                    .messages
                    .as_ref()
                    .map_or(0, std::vec::Vec::len);
                write!(
                    f,
                    "[{}@{}] update (+{added} messages)",
                    update.node, update.step
                )
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeEvent {
    node_id: Option<String>,
    step: Option<u64>,
    scope: String,
    message: String,
}

impl NodeEvent {
    pub fn new(node_id: Option<String>, step: Option<u64>, scope: String, message: String) -> Self {
        Self {
            node_id,
            step,
            scope,
            message,
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    pub fn step(&self) -> Option<u64> {
        self.step
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    scope: String,
    message: String,
}

impl DiagnosticEvent {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Per-node streaming payload: the delta one node contributed at one step.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UpdateEvent {
    /// Display name of the node that produced the delta.
    pub node: String,
    /// Superstep number the delta was committed at.
    pub step: u64,
    /// The contributed delta.
    pub delta: StateDelta,
}
