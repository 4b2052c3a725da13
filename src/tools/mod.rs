//! Tool execution: the [`Tool`] trait, the explicit [`ToolRegistry`], and
//! the prebuilt [`ToolNode`].
//!
//! Registration is explicit; there is no discovery or reflection. A tool's
//! *execution* failure is recoverable and lands in the transcript as a
//! flagged tool message. Invoking a name that was never registered is a
//! structural error and halts the run.

pub mod node;
pub mod registry;

pub use node::ToolNode;
pub use registry::{Tool, ToolError, ToolExecutionError, ToolRegistry, ToolSpec};
