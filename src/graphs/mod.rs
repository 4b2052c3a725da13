//! Graph definition, conditional routing, and compilation.
//!
//! The entry point is [`GraphBuilder`]: add nodes, static edges, and
//! conditional edges, then compile into an executable [`Graph`].
//!
//! # Core concepts
//!
//! - **Nodes**: units of work implementing [`Node`](crate::node::Node)
//! - **Edges**: static connections; multiple edges from one node fan out
//! - **Conditional edges**: a [`Router`] picks a key, a declared
//!   [`RouteTable`] maps it to a target; undeclared keys fail the run
//! - **Virtual endpoints**: `NodeKind::Start` / `NodeKind::End` anchor the
//!   topology but are never executed
//!
//! # Quick start
//!
//! ```
//! use relaygraph::graphs::{tools_condition, tools_route_table, GraphBuilder};
//! use relaygraph::types::NodeKind;
//! use relaygraph::node::{Node, NodeContext, NodeError, NodeOutput, StateDelta};
//! use relaygraph::state::StateSnapshot;
//! use async_trait::async_trait;
//!
//! struct ModelStub;
//!
//! #[async_trait]
//! impl Node for ModelStub {
//!     async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeOutput, NodeError> {
//!         Ok(StateDelta::new().into())
//!     }
//! }
//!
//! let graph = GraphBuilder::new()
//!     .add_node("model", ModelStub)
//!     .add_node("tools", ModelStub)
//!     .add_edge(NodeKind::Start, "model")
//!     .add_conditional_edge("model", tools_condition(), tools_route_table("tools"))
//!     .add_edge("tools", "model")
//!     .compile()
//!     .unwrap();
//! ```

mod builder;
mod compilation;
mod edges;

pub use builder::GraphBuilder;
pub use compilation::{Graph, GraphBuildError};
pub use edges::{
    tools_condition, tools_route_table, ConditionalEdge, RouteTable, Router, RoutingError, DONE,
    USE_TOOLS,
};
