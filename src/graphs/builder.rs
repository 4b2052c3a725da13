//! Fluent builder for workflow graphs.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::edges::{ConditionalEdge, RouteTable, Router};
use crate::node::Node;
use crate::runtimes::RuntimeConfig;
use crate::types::NodeKind;

/// Builder for workflow graphs.
///
/// Add nodes, edges, and configuration, then [`compile`](Self::compile)
/// into an executable [`Graph`](super::Graph). `NodeKind::Start` and
/// `NodeKind::End` are virtual endpoints: they anchor edges but are never
/// registered or executed.
///
/// # Examples
///
/// ```
/// use relaygraph::graphs::GraphBuilder;
/// use relaygraph::types::NodeKind;
///
/// # struct MyNode;
/// # #[async_trait::async_trait]
/// # impl relaygraph::node::Node for MyNode {
/// #     async fn run(&self, _: relaygraph::state::StateSnapshot, _: relaygraph::node::NodeContext) -> Result<relaygraph::node::NodeOutput, relaygraph::node::NodeError> {
/// #         Ok(relaygraph::node::StateDelta::new().into())
/// #     }
/// # }
///
/// let graph = GraphBuilder::new()
///     .add_node("worker", MyNode)
///     .add_edge(NodeKind::Start, "worker")
///     .add_edge("worker", NodeKind::End)
///     .compile()
///     .unwrap();
/// ```
pub struct GraphBuilder {
    /// Registry of all nodes in the graph, keyed by their identifier.
    pub nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    /// Unconditional edges defining static topology.
    pub edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    /// Conditional edges for state-driven routing.
    pub conditional_edges: Vec<ConditionalEdge>,
    /// Runtime configuration for the compiled graph.
    pub runtime_config: RuntimeConfig,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            conditional_edges: Vec::new(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Adds a node to the graph.
    ///
    /// Registrations of the virtual `Start`/`End` kinds are ignored with a
    /// warning; they exist only as edge anchors.
    #[must_use]
    pub fn add_node(mut self, id: impl Into<NodeKind>, node: impl Node + 'static) -> Self {
        let id = id.into();
        match id {
            NodeKind::Start | NodeKind::End => {
                tracing::warn!(?id, "ignoring registration of virtual node kind");
            }
            _ => {
                self.nodes.insert(id, Arc::new(node));
            }
        }
        self
    }

    /// Adds a node that is already behind an `Arc` (subgraphs, shared nodes).
    #[must_use]
    pub fn add_shared_node(mut self, id: impl Into<NodeKind>, node: Arc<dyn Node>) -> Self {
        let id = id.into();
        match id {
            NodeKind::Start | NodeKind::End => {
                tracing::warn!(?id, "ignoring registration of virtual node kind");
            }
            _ => {
                self.nodes.insert(id, node);
            }
        }
        self
    }

    /// Adds an unconditional edge.
    ///
    /// Multiple edges from the same node fan out: all targets join the next
    /// frontier together.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<NodeKind>, to: impl Into<NodeKind>) -> Self {
        self.edges.entry(from.into()).or_default().push(to.into());
        self
    }

    /// Adds a conditional edge: when `from` completes, `router` inspects the
    /// post-barrier snapshot and the produced key is resolved against
    /// `table`. Undeclared keys fail the run.
    #[must_use]
    pub fn add_conditional_edge(
        mut self,
        from: impl Into<NodeKind>,
        router: Router,
        table: RouteTable,
    ) -> Self {
        self.conditional_edges
            .push(ConditionalEdge::new(from, router, table));
        self
    }

    /// Configures runtime settings for the compiled graph.
    #[must_use]
    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = runtime_config;
        self
    }
}
