//! External collaborators the runtime calls into: chat models, retrievers,
//! and SQL databases.
//!
//! These are trait seams, not provider bindings. Applications implement
//! them against whatever backend they use; the test suite implements them
//! as scripted doubles.

pub mod model;
pub mod retriever;
pub mod sql;

pub use model::{BinaryScore, ChatModel, ModelError, ToolChoice};
pub use retriever::{Document, Retriever, RetrieverError, RetrieverTool};
pub use sql::{ensure_read_only, ListTablesTool, SchemaTool, SqlDatabase, SqlError, SqlQueryTool};
