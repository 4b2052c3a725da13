use async_trait::async_trait;
use futures_util::future::join_all;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use crate::message::{Message, ToolCall};

/// A callable capability exposed to models.
///
/// Implementations receive the JSON arguments from a [`ToolCall`] and return
/// a JSON result. Failures are reported through [`ToolExecutionError`]; the
/// registry turns them into flagged tool messages rather than aborting.
#[async_trait]
pub trait Tool: Send + Sync {
    async fn call(&self, args: Value) -> Result<Value, ToolExecutionError>;
}

/// Declarative description of a tool, handed to models for binding.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    /// Unique tool name, the invocation key.
    pub name: String,
    /// Human/model-readable description of what the tool does.
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

impl ToolSpec {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool's own failure report. Recoverable: the run continues with the
/// error text in the transcript.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ToolExecutionError {
    pub message: String,
}

impl ToolExecutionError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Structural tool errors. Unlike [`ToolExecutionError`] these halt the run.
#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    /// A tool with this name is already registered.
    #[error("tool {name:?} is already registered")]
    #[diagnostic(
        code(relaygraph::tools::duplicate),
        help("Tool names are the invocation keys; pick a distinct name.")
    )]
    Duplicate { name: String },

    /// An invocation referenced a name that was never registered.
    #[error("unknown tool {name:?}")]
    #[diagnostic(
        code(relaygraph::tools::unknown),
        help("Register the tool before wiring it into a graph, or fix the model's tool binding.")
    )]
    Unknown { name: String },
}

/// Explicit name-to-tool mapping with ordered, concurrent invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use relaygraph::tools::{Tool, ToolExecutionError, ToolRegistry, ToolSpec};
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
///
/// struct Add;
///
/// #[async_trait]
/// impl Tool for Add {
///     async fn call(&self, args: Value) -> Result<Value, ToolExecutionError> {
///         let a = args["a"].as_f64().ok_or_else(|| ToolExecutionError::new("missing a"))?;
///         let b = args["b"].as_f64().ok_or_else(|| ToolExecutionError::new("missing b"))?;
///         Ok(json!(a + b))
///     }
/// }
///
/// let mut registry = ToolRegistry::new();
/// registry.register(
///     ToolSpec::new("add", "Add two numbers.", json!({"type": "object"})),
///     std::sync::Arc::new(Add),
/// ).unwrap();
/// ```
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: FxHashMap<String, (ToolSpec, Arc<dyn Tool>)>,
    order: Vec<String>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its spec's name.
    pub fn register(&mut self, spec: ToolSpec, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        if self.tools.contains_key(&spec.name) {
            return Err(ToolError::Duplicate {
                name: spec.name.clone(),
            });
        }
        self.order.push(spec.name.clone());
        self.tools.insert(spec.name.clone(), (spec, tool));
        Ok(())
    }

    /// Builder-style [`register`](Self::register); panics on duplicates, so
    /// reserve it for static wiring where a duplicate is a programming bug.
    #[must_use]
    pub fn with_tool(mut self, spec: ToolSpec, tool: Arc<dyn Tool>) -> Self {
        let name = spec.name.clone();
        assert!(
            self.register(spec, tool).is_ok(),
            "duplicate tool name {name:?}"
        );
        self
    }

    /// The registered specs, in registration order. Hand these to a model.
    #[must_use]
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name).map(|(spec, _)| spec.clone()))
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invokes one tool call, producing the answering tool message.
    ///
    /// An unknown name is a structural error. An execution failure is not:
    /// it becomes a flagged tool message carrying the error text, so the
    /// model can see and react to it.
    #[instrument(skip(self, call), fields(tool = %call.name))]
    pub async fn invoke(&self, call: &ToolCall) -> Result<Message, ToolError> {
        let (_, tool) = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::Unknown {
                name: call.name.clone(),
            })?;

        match tool.call(call.args.clone()).await {
            Ok(result) => {
                let content = match result {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Ok(Message::tool(content, &call.id, &call.name))
            }
            Err(err) => {
                tracing::warn!(tool = %call.name, error = %err, "tool execution failed");
                Ok(Message::tool_error(err.message, &call.id, &call.name))
            }
        }
    }

    /// Invokes every call concurrently and returns one tool message per
    /// call **in the original order**, ids matched to their calls.
    pub async fn invoke_all(&self, calls: &[ToolCall]) -> Result<Vec<Message>, ToolError> {
        // Validate names up front so an unknown tool fails before any side
        // effects run.
        for call in calls {
            if !self.contains(&call.name) {
                return Err(ToolError::Unknown {
                    name: call.name.clone(),
                });
            }
        }
        let futures = calls.iter().map(|call| self.invoke(call));
        join_all(futures).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Add;

    #[async_trait]
    impl Tool for Add {
        async fn call(&self, args: Value) -> Result<Value, ToolExecutionError> {
            let a = args["a"]
                .as_f64()
                .ok_or_else(|| ToolExecutionError::new("missing argument a"))?;
            let b = args["b"]
                .as_f64()
                .ok_or_else(|| ToolExecutionError::new("missing argument b"))?;
            Ok(json!(a + b))
        }
    }

    fn add_spec() -> ToolSpec {
        ToolSpec::new("add", "Add two numbers.", json!({"type": "object"}))
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(add_spec(), Arc::new(Add)).unwrap();
        let err = registry.register(add_spec(), Arc::new(Add)).unwrap_err();
        assert!(matches!(err, ToolError::Duplicate { name } if name == "add"));
    }

    #[tokio::test]
    async fn unknown_tool_is_structural() {
        let registry = ToolRegistry::new();
        let call = ToolCall::new("c1", "nope", json!({}));
        let err = registry.invoke(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::Unknown { name } if name == "nope"));
    }

    #[tokio::test]
    async fn execution_failure_becomes_flagged_message() {
        let mut registry = ToolRegistry::new();
        registry.register(add_spec(), Arc::new(Add)).unwrap();

        let call = ToolCall::new("c1", "add", json!({"a": 1}));
        let message = registry.invoke(&call).await.unwrap();
        assert!(message.is_error);
        assert_eq!(message.tool_call_id.as_deref(), Some("c1"));
        assert!(message.content.contains("missing argument b"));
    }

    #[tokio::test]
    async fn invoke_all_preserves_call_order() {
        let mut registry = ToolRegistry::new();
        registry.register(add_spec(), Arc::new(Add)).unwrap();

        let calls = vec![
            ToolCall::new("c1", "add", json!({"a": 1, "b": 2})),
            ToolCall::new("c2", "add", json!({"a": 10, "b": 20})),
            ToolCall::new("c3", "add", json!({"a": 100, "b": 200})),
        ];
        let messages = registry.invoke_all(&calls).await.unwrap();
        let ids: Vec<_> = messages
            .iter()
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(messages[2].content, "300.0");
    }

    #[tokio::test]
    async fn invoke_all_rejects_any_unknown_name_up_front() {
        let mut registry = ToolRegistry::new();
        registry.register(add_spec(), Arc::new(Add)).unwrap();

        let calls = vec![
            ToolCall::new("c1", "add", json!({"a": 1, "b": 2})),
            ToolCall::new("c2", "missing", json!({})),
        ];
        assert!(registry.invoke_all(&calls).await.is_err());
    }
}
