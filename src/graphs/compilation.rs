//! Graph compilation and structural validation.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

use super::builder::GraphBuilder;
use super::edges::ConditionalEdge;
use crate::node::Node;
use crate::runtimes::RuntimeConfig;
use crate::types::NodeKind;

/// Structural problems caught at compile time.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphBuildError {
    /// No edge leaves the virtual Start node.
    #[error("graph has no entry edge from Start")]
    #[diagnostic(
        code(relaygraph::graphs::missing_entry),
        help("Add at least one edge from NodeKind::Start to an application node.")
    )]
    MissingEntry,

    /// An edge references a node that was never added.
    #[error("edge {from} -> {to} references unknown node {unknown}")]
    #[diagnostic(
        code(relaygraph::graphs::unknown_edge_target),
        help("Every edge endpoint must be a registered node, Start, or End.")
    )]
    UnknownEdgeTarget {
        from: NodeKind,
        to: NodeKind,
        unknown: NodeKind,
    },

    /// A conditional edge's table routes to a node that was never added.
    #[error("conditional edge from {from} routes key {key:?} to unknown node {unknown}")]
    #[diagnostic(code(relaygraph::graphs::unknown_route_target))]
    UnknownRouteTarget {
        from: NodeKind,
        key: String,
        unknown: NodeKind,
    },
}

/// An executable, validated workflow graph.
///
/// Produced by [`GraphBuilder::compile`]; run it through a
/// [`GraphExecutor`](crate::runtimes::GraphExecutor).
#[derive(Clone)]
pub struct Graph {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    conditional_edges: Vec<ConditionalEdge>,
    runtime_config: RuntimeConfig,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("conditional_edges", &self.conditional_edges.len())
            .field("runtime_config", &self.runtime_config)
            .finish_non_exhaustive()
    }
}

impl Graph {
    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<NodeKind, Arc<dyn Node>> {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &FxHashMap<NodeKind, Vec<NodeKind>> {
        &self.edges
    }

    #[must_use]
    pub fn conditional_edges(&self) -> &[ConditionalEdge] {
        &self.conditional_edges
    }

    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    /// The initial frontier: targets of the Start edges.
    #[must_use]
    pub fn entry_frontier(&self) -> Vec<NodeKind> {
        self.edges
            .get(&NodeKind::Start)
            .cloned()
            .unwrap_or_default()
    }

    /// The conditional edge leaving `from`, if one was declared.
    #[must_use]
    pub fn conditional_edge_for(&self, from: &NodeKind) -> Option<&ConditionalEdge> {
        self.conditional_edges.iter().find(|e| e.from() == from)
    }
}

impl GraphBuilder {
    /// Validates the builder and produces an executable [`Graph`].
    ///
    /// Checks performed:
    /// - at least one entry edge leaves Start
    /// - every static edge endpoint is a registered node, Start, or End
    /// - every conditional edge source and table target is known
    pub fn compile(self) -> Result<Graph, GraphBuildError> {
        let known = |kind: &NodeKind| -> bool {
            match kind {
                NodeKind::Start | NodeKind::End => true,
                custom => self.nodes.contains_key(custom),
            }
        };

        if self
            .edges
            .get(&NodeKind::Start)
            .is_none_or(|targets| targets.is_empty())
        {
            return Err(GraphBuildError::MissingEntry);
        }

        for (from, targets) in &self.edges {
            for to in targets {
                for endpoint in [from, to] {
                    if !known(endpoint) {
                        return Err(GraphBuildError::UnknownEdgeTarget {
                            from: from.clone(),
                            to: to.clone(),
                            unknown: endpoint.clone(),
                        });
                    }
                }
            }
        }

        for edge in &self.conditional_edges {
            if !known(edge.from()) {
                return Err(GraphBuildError::UnknownEdgeTarget {
                    from: edge.from().clone(),
                    to: NodeKind::End,
                    unknown: edge.from().clone(),
                });
            }
            for (key, target) in edge.table().entries() {
                if !known(target) {
                    return Err(GraphBuildError::UnknownRouteTarget {
                        from: edge.from().clone(),
                        key: key.clone(),
                        unknown: target.clone(),
                    });
                }
            }
        }

        Ok(Graph {
            nodes: self.nodes,
            edges: self.edges,
            conditional_edges: self.conditional_edges,
            runtime_config: self.runtime_config,
        })
    }
}
