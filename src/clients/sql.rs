use async_trait::async_trait;
use miette::Diagnostic;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::tools::{Tool, ToolExecutionError, ToolSpec};

#[derive(Debug, Error, Diagnostic)]
#[error("sql client error: {message}")]
#[diagnostic(code(relaygraph::clients::sql))]
pub struct SqlError {
    pub message: String,
}

impl SqlError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Read-only database seam for SQL question-answering agents.
#[async_trait]
pub trait SqlDatabase: Send + Sync {
    /// Table names, for the model to pick from.
    async fn list_tables(&self) -> Result<Vec<String>, SqlError>;

    /// DDL and sample rows for the named tables.
    async fn schema(&self, tables: &[String]) -> Result<String, SqlError>;

    /// Runs a SELECT and returns rows rendered as text.
    async fn run(&self, query: &str) -> Result<String, SqlError>;
}

/// Rejects statements that would mutate the database.
///
/// The check is lexical: any leading keyword other than SELECT or WITH is
/// refused, as is any occurrence of a mutating keyword inside the text.
/// Crude, but the worst case is refusing a legitimate query.
pub fn ensure_read_only(query: &str) -> Result<(), SqlError> {
    const FORBIDDEN: [&str; 8] = [
        "insert", "update", "delete", "drop", "alter", "create", "truncate", "replace",
    ];
    let lowered = query.to_lowercase();
    let first = lowered.split_whitespace().next().unwrap_or("");
    if first != "select" && first != "with" {
        return Err(SqlError::new(format!(
            "only SELECT statements are allowed, got {first:?}"
        )));
    }
    for word in lowered.split(|c: char| !c.is_ascii_alphanumeric() && c != '_') {
        if FORBIDDEN.contains(&word) {
            return Err(SqlError::new(format!(
                "query contains forbidden keyword {word:?}"
            )));
        }
    }
    Ok(())
}

/// Tool wrapper over [`SqlDatabase::list_tables`]. Takes no arguments.
pub struct ListTablesTool {
    db: Arc<dyn SqlDatabase>,
}

impl ListTablesTool {
    #[must_use]
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            "sql_db_list_tables",
            "List all tables in the database.",
            serde_json::json!({"type": "object", "properties": {}}),
        )
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    async fn call(&self, _args: Value) -> Result<Value, ToolExecutionError> {
        let tables = self
            .db
            .list_tables()
            .await
            .map_err(|e| ToolExecutionError::new(e.message))?;
        Ok(Value::String(tables.join(", ")))
    }
}

/// Tool wrapper over [`SqlDatabase::schema`].
///
/// Arguments: `{"tables": ["t1", "t2"]}`.
pub struct SchemaTool {
    db: Arc<dyn SqlDatabase>,
}

impl SchemaTool {
    #[must_use]
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            "sql_db_schema",
            "Show the schema and sample rows for the named tables.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "tables": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Table names to describe."
                    }
                },
                "required": ["tables"]
            }),
        )
    }
}

#[async_trait]
impl Tool for SchemaTool {
    async fn call(&self, args: Value) -> Result<Value, ToolExecutionError> {
        let tables: Vec<String> = args["tables"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .ok_or_else(|| ToolExecutionError::new("missing array argument: tables"))?;
        let schema = self
            .db
            .schema(&tables)
            .await
            .map_err(|e| ToolExecutionError::new(e.message))?;
        Ok(Value::String(schema))
    }
}

/// Tool wrapper over [`SqlDatabase::run`], guarded by [`ensure_read_only`].
///
/// Arguments: `{"query": "SELECT ..."}`.
pub struct SqlQueryTool {
    db: Arc<dyn SqlDatabase>,
}

impl SqlQueryTool {
    #[must_use]
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            "sql_db_query",
            "Execute a read-only SQL query and return the result rows.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "A SELECT statement."}
                },
                "required": ["query"]
            }),
        )
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    async fn call(&self, args: Value) -> Result<Value, ToolExecutionError> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| ToolExecutionError::new("missing string argument: query"))?;
        ensure_read_only(query).map_err(|e| ToolExecutionError::new(e.message))?;
        let rows = self
            .db
            .run(query)
            .await
            .map_err(|e| ToolExecutionError::new(e.message))?;
        Ok(Value::String(rows))
    }
}
