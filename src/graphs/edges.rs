//! Conditional routing: router functions, declared route tables, and the
//! built-in [`tools_condition`] router.
//!
//! A router maps a state snapshot to a *key*; the key is looked up in the
//! edge's declared [`RouteTable`]. Resolution is eager: an undeclared key
//! fails the run with [`RoutingError`] at the moment the router produces
//! it, not some steps later.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Routing key produced by [`tools_condition`] when tool calls are pending.
pub const USE_TOOLS: &str = "use-tools";
/// Routing key produced by [`tools_condition`] when the turn is finished.
pub const DONE: &str = "done";

/// Pure routing function: inspects a snapshot and names a route key.
///
/// Routers make no side effects and no routing decision of their own; the
/// decision lives in the [`RouteTable`] declared next to them.
pub type Router = Arc<dyn Fn(&StateSnapshot) -> String + Send + Sync + 'static>;

/// Declared key-to-target map of a conditional edge.
///
/// ```rust
/// use relaygraph::graphs::RouteTable;
/// use relaygraph::types::NodeKind;
///
/// let table = RouteTable::new()
///     .with_route("use-tools", "tools")
///     .with_route("done", NodeKind::End);
/// assert!(table.resolve("use-tools").is_ok());
/// assert!(table.resolve("retry").is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    table: FxHashMap<String, NodeKind>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_route(mut self, key: impl Into<String>, target: impl Into<NodeKind>) -> Self {
        self.table.insert(key.into(), target.into());
        self
    }

    /// Looks a key up, failing eagerly on anything undeclared.
    pub fn resolve(&self, key: &str) -> Result<&NodeKind, RoutingError> {
        self.table.get(key).ok_or_else(|| {
            let mut declared: Vec<String> = self.table.keys().cloned().collect();
            declared.sort();
            RoutingError {
                key: key.to_string(),
                declared,
            }
        })
    }

    /// Every declared target, for compile-time validation.
    pub fn targets(&self) -> impl Iterator<Item = &NodeKind> {
        self.table.values()
    }

    /// Declared key/target pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &NodeKind)> {
        self.table.iter()
    }
}

impl<K: Into<String>, T: Into<NodeKind>> FromIterator<(K, T)> for RouteTable {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, target) in iter {
            table = table.with_route(key, target);
        }
        table
    }
}

/// A router produced a key its table never declared.
#[derive(Debug, Error, Diagnostic)]
#[error("router produced undeclared key {key:?} (declared: {declared:?})")]
#[diagnostic(
    code(relaygraph::graphs::routing),
    help("Every key a router can return must appear in its route table.")
)]
pub struct RoutingError {
    pub key: String,
    pub declared: Vec<String>,
}

/// A conditional edge: source node, router, and its declared table.
#[derive(Clone)]
pub struct ConditionalEdge {
    from: NodeKind,
    router: Router,
    table: RouteTable,
}

impl ConditionalEdge {
    pub fn new(from: impl Into<NodeKind>, router: Router, table: RouteTable) -> Self {
        Self {
            from: from.into(),
            router,
            table,
        }
    }

    /// The source node of this edge.
    #[must_use]
    pub fn from(&self) -> &NodeKind {
        &self.from
    }

    /// The declared table (for validation).
    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Evaluates the router against a snapshot and resolves the key.
    pub fn route(&self, snapshot: &StateSnapshot) -> Result<NodeKind, RoutingError> {
        let key = (self.router)(snapshot);
        self.table.resolve(&key).cloned()
    }
}

/// Built-in router for the model/tool loop.
///
/// Returns [`USE_TOOLS`] when the last message is an assistant message with
/// pending tool calls, else [`DONE`]. Zero tool calls therefore route to
/// whatever the table binds to `done`, conventionally [`NodeKind::End`].
#[must_use]
pub fn tools_condition() -> Router {
    Arc::new(|snapshot: &StateSnapshot| {
        if snapshot.pending_tool_calls().is_empty() {
            DONE.to_string()
        } else {
            USE_TOOLS.to_string()
        }
    })
}

/// The standard table paired with [`tools_condition`]: tool calls go to
/// `tools_node`, everything else ends the run.
#[must_use]
pub fn tools_route_table(tools_node: impl Into<NodeKind>) -> RouteTable {
    RouteTable::new()
        .with_route(USE_TOOLS, tools_node)
        .with_route(DONE, NodeKind::End)
}
