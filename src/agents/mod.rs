//! Multi-agent building blocks: subgraph nesting, hand-off tools, the
//! supervisor pattern, and the ReAct loop.
//!
//! Everything here composes from the primitives in [`graphs`](crate::graphs)
//! and [`node`](crate::node); none of it is special-cased by the runtime.
//!
//! - [`SubgraphNode`] wraps a compiled graph so it can sit inside another
//!   graph as an ordinary node
//! - [`handoff`](crate::agents::handoff) builds the `transfer_to_*` tools a
//!   routing agent uses to pass control
//! - [`SupervisorNode`] / [`supervisor_graph`] implement the hub-and-spoke
//!   supervisor pattern over those hand-offs
//! - [`create_react_agent`] assembles the canonical model/tools loop

pub mod handoff;
pub mod react;
pub mod subgraph;
pub mod supervisor;

pub use handoff::{delegate_task, handoff_command, handoff_tool_name, handoff_tool_spec};
pub use react::{create_react_agent, ModelNode};
pub use subgraph::SubgraphNode;
pub use supervisor::{supervisor_graph, SupervisorNode, Worker};
