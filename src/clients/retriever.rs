use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::tools::{Tool, ToolExecutionError, ToolSpec};

/// A retrieved document: content plus source metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub content: String,
    pub metadata: FxHashMap<String, Value>,
}

impl Document {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: FxHashMap::default(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("retrieval failed: {message}")]
#[diagnostic(code(relaygraph::clients::retriever))]
pub struct RetrieverError {
    pub message: String,
}

/// Semantic search seam. Vector-store internals live behind it.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn query(&self, text: &str) -> Result<Vec<Document>, RetrieverError>;
}

/// Exposes a [`Retriever`] as a registry tool.
///
/// Arguments: `{"query": "..."}`. Returns the retrieved documents joined
/// by blank lines, ready to drop into a prompt.
pub struct RetrieverTool<R: Retriever> {
    retriever: R,
}

impl<R: Retriever> RetrieverTool<R> {
    #[must_use]
    pub fn new(retriever: R) -> Self {
        Self { retriever }
    }

    /// The spec to register this tool under.
    #[must_use]
    pub fn spec(name: impl Into<String>, description: impl Into<String>) -> ToolSpec {
        ToolSpec::new(
            name,
            description,
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query."}
                },
                "required": ["query"]
            }),
        )
    }
}

#[async_trait]
impl<R: Retriever> Tool for RetrieverTool<R> {
    async fn call(&self, args: Value) -> Result<Value, ToolExecutionError> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| ToolExecutionError::new("missing string argument: query"))?;
        let documents = self
            .retriever
            .query(query)
            .await
            .map_err(|e| ToolExecutionError::new(e.message))?;
        let joined = documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Value::String(joined))
    }
}
