use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::message::Message;
use crate::tools::ToolSpec;

/// How strongly a model is steered toward tool use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// Model decides whether to call tools.
    #[default]
    Auto,
    /// Model must call at least one tool. Used by supervisors whose only
    /// job is to pick a worker.
    Required,
    /// Tools are bound for context but must not be called.
    NoTools,
}

/// A model invocation failed. Fatal: unlike tool failures, a broken model
/// leaves the run with nothing sensible to continue from.
#[derive(Debug, Error, Diagnostic)]
#[error("model invocation failed ({provider}): {message}")]
#[diagnostic(code(relaygraph::clients::model))]
pub struct ModelError {
    pub provider: &'static str,
    pub message: String,
}

impl ModelError {
    #[must_use]
    pub fn new(provider: &'static str, message: impl Into<String>) -> Self {
        Self {
            provider,
            message: message.into(),
        }
    }
}

/// Chat-completion model seam.
///
/// `invoke` returns one assistant message, which may carry tool calls.
/// `structured` forces the output into a caller-supplied JSON schema, for
/// fixed-shape answers like a binary relevance grade.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        tool_choice: ToolChoice,
    ) -> Result<Message, ModelError>;

    async fn structured(
        &self,
        _messages: &[Message],
        _schema: &Value,
    ) -> Result<Value, ModelError> {
        Err(ModelError::new(
            "unknown",
            "structured output not supported by this model",
        ))
    }
}

/// Binary yes/no grade, the fixed schema used for relevance scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryScore {
    Yes,
    No,
}

impl BinaryScore {
    /// Parses a structured-output value of the shape
    /// `{"binary_score": "yes" | "no"}`.
    pub fn from_structured(value: &Value) -> Option<Self> {
        match value.get("binary_score").and_then(Value::as_str) {
            Some("yes") => Some(BinaryScore::Yes),
            Some("no") => Some(BinaryScore::No),
            _ => None,
        }
    }

    /// The JSON schema to hand to [`ChatModel::structured`].
    #[must_use]
    pub fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "binary_score": {
                    "type": "string",
                    "enum": ["yes", "no"],
                    "description": "Relevance grade: 'yes' if relevant, 'no' if not."
                }
            },
            "required": ["binary_score"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn binary_score_parses_structured_shape() {
        assert_eq!(
            BinaryScore::from_structured(&json!({"binary_score": "yes"})),
            Some(BinaryScore::Yes)
        );
        assert_eq!(
            BinaryScore::from_structured(&json!({"binary_score": "maybe"})),
            None
        );
    }
}
