use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::instrument;

use crate::channels::Channel;
use crate::control::{Command, CommandScope, Goto, Send};
use crate::event_bus::{Event, EventBus, STREAM_END_SCOPE};
use crate::graphs::{Graph, RoutingError};
use crate::node::{NodeContext, NodeError, NodeOutput, StateDelta};
use crate::reducers::{ReducerError, ReducerRegistry};
use crate::runtimes::checkpointer::restore_thread_session;
use crate::runtimes::{
    Checkpoint, Checkpointer, CheckpointerError, CheckpointerType, InMemoryCheckpointer,
    SessionInit, ThreadSession,
};
use crate::state::AgentState;
use crate::types::NodeKind;
use crate::utils::id_generator::IdGenerator;

/// Result of one superstep.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: u64,
    pub ran_nodes: Vec<NodeKind>,
    pub next_frontier: Vec<NodeKind>,
    pub completed: bool,
}

/// How a run ended.
///
/// `ParentCommand` is the subgraph escape hatch: a node inside this graph
/// issued a command scoped to the enclosing graph, so this run stops and
/// hands the command up. Only subgraph wrappers should see this variant;
/// [`GraphExecutor::run_until_complete`] treats it as an error.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The frontier drained (or reached End).
    Completed(AgentState),
    /// A parent-scoped command stopped the run.
    ParentCommand {
        /// State after the command's update was applied.
        state: AgentState,
        /// The escaping command, still scoped to `Parent`.
        command: Command,
        /// The node that issued it.
        origin: NodeKind,
    },
}

enum StepFlow {
    Ran(StepReport),
    Escalate { origin: NodeKind, command: Command },
}

#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("thread not found: {thread_id}")]
    #[diagnostic(code(relaygraph::runner::thread_not_found))]
    ThreadNotFound { thread_id: String },

    #[error("recursion limit of {limit} supersteps exceeded")]
    #[diagnostic(
        code(relaygraph::runner::recursion_limit),
        help(
            "The run is looping more than the configured ceiling allows. Raise \
             recursion_limit if the loop is intentional, or fix the routing."
        )
    )]
    RecursionLimitExceeded { limit: u64 },

    #[error("node {node} issued a parent-scoped command but the graph has no parent")]
    #[diagnostic(
        code(relaygraph::runner::no_parent_graph),
        help("Parent-scoped commands are only valid inside a subgraph node.")
    )]
    NoParentGraph { node: NodeKind },

    #[error("node {from} routed to unknown node {target}")]
    #[diagnostic(
        code(relaygraph::runner::unknown_goto_target),
        help("Command targets must be registered nodes or End.")
    )]
    UnknownGotoTarget { from: NodeKind, target: NodeKind },

    #[error("frontier references node {node} with no implementation")]
    #[diagnostic(code(relaygraph::runner::missing_node))]
    MissingNode { node: NodeKind },

    #[error("node {node} failed: {source}")]
    #[diagnostic(code(relaygraph::runner::node))]
    Node {
        node: NodeKind,
        #[source]
        source: NodeError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reducer(#[from] ReducerError),

    #[error("node task join error: {0}")]
    #[diagnostic(code(relaygraph::runner::join))]
    Join(#[from] JoinError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpointer(#[from] CheckpointerError),
}

/// Runtime execution engine: drives compiled [`Graph`]s superstep by
/// superstep, one isolated session per thread id.
///
/// # Graph vs GraphExecutor
///
/// - **`Graph`**: the topology (nodes, edges, routing)
/// - **`GraphExecutor`**: the runtime (threads, events, checkpoints)
///
/// One `Graph` can back many executors, and one executor can interleave
/// many threads; each thread's transcript and scratch space never leak
/// into another's.
///
/// # Execution model
///
/// Each superstep snapshots the state, runs every frontier node
/// concurrently, then merges all returned deltas at a barrier in frontier
/// order. Routing is resolved after the barrier, so a command's update is
/// always visible before its jump takes effect. One
/// [`Event::Update`](crate::event_bus::Event) is emitted per completed
/// node, carrying exactly that node's delta.
///
/// # Example
///
/// ```rust,no_run
/// use relaygraph::runtimes::GraphExecutor;
/// use relaygraph::state::AgentState;
/// # use relaygraph::graphs::Graph;
/// # async fn example(graph: Graph) -> Result<(), Box<dyn std::error::Error>> {
/// let mut executor = GraphExecutor::new(graph).await;
/// executor
///     .create_thread("thread-1".into(), AgentState::new_with_user_message("Hi, I'm Will"))
///     .await?;
/// let final_state = executor.run_until_complete("thread-1").await?;
/// # Ok(())
/// # }
/// ```
pub struct GraphExecutor {
    graph: Arc<Graph>,
    sessions: FxHashMap<String, ThreadSession>,
    reducers: ReducerRegistry,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    autosave: bool,
    event_bus: EventBus,
}

impl GraphExecutor {
    /// Create an executor using the graph's own runtime configuration
    /// (checkpointer type, event bus sinks, recursion limit).
    pub async fn new(graph: Graph) -> Self {
        Self::with_options(graph, true).await
    }

    /// Create with an autosave toggle. When autosave is off, checkpoints
    /// are only written by explicit [`checkpoint`](Self::checkpoint) calls.
    pub async fn with_options(graph: Graph, autosave: bool) -> Self {
        let event_bus = graph.runtime_config().event_bus.build_event_bus();
        Self::with_options_and_bus(graph, autosave, event_bus, true).await
    }

    /// Create with a caller-supplied [`EventBus`], for streaming node
    /// updates into custom sinks. `start_listener` controls whether the
    /// bus's background broadcast task is spawned immediately.
    pub async fn with_options_and_bus(
        graph: Graph,
        autosave: bool,
        event_bus: EventBus,
        start_listener: bool,
    ) -> Self {
        let checkpointer = Self::create_checkpointer(&graph).await;
        if start_listener {
            event_bus.listen_for_events();
        }
        Self {
            graph: Arc::new(graph),
            sessions: FxHashMap::default(),
            reducers: ReducerRegistry::default(),
            checkpointer,
            autosave,
            event_bus,
        }
    }

    async fn create_checkpointer(graph: &Graph) -> Option<Arc<dyn Checkpointer>> {
        match &graph.runtime_config().checkpointer {
            None => None,
            Some(CheckpointerType::InMemory) => Some(Arc::new(InMemoryCheckpointer::new())),
            #[cfg(feature = "sqlite")]
            Some(CheckpointerType::SQLite) => {
                let db_url = std::env::var("RELAYGRAPH_SQLITE_URL")
                    .ok()
                    .or_else(|| {
                        graph
                            .runtime_config()
                            .sqlite_db_name
                            .as_ref()
                            .map(|name| format!("sqlite://{name}"))
                    })
                    .unwrap_or_else(|| "sqlite://relaygraph.db".to_string());
                // SqlitePool::connect will not create the file itself.
                if let Some(path) = db_url.strip_prefix("sqlite://") {
                    let path = path.trim();
                    if !path.is_empty() {
                        let p = std::path::Path::new(path);
                        if let Some(parent) = p.parent() {
                            let _ = std::fs::create_dir_all(parent);
                        }
                        if !p.exists() {
                            let _ = std::fs::File::create_new(p);
                        }
                    }
                }
                match crate::runtimes::SQLiteCheckpointer::connect(&db_url).await {
                    Ok(cp) => Some(Arc::new(cp) as Arc<dyn Checkpointer>),
                    Err(e) => {
                        tracing::error!(
                            url = %db_url,
                            error = %e,
                            "SQLiteCheckpointer initialization failed"
                        );
                        None
                    }
                }
            }
        }
    }

    /// The event bus driving this executor's sinks. Use
    /// [`EventBus::add_sink`] before running to attach per-run streaming.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Initialize a thread with the given initial state.
    ///
    /// If the checkpointer already holds history for this id, the thread is
    /// restored from its latest checkpoint instead: the initial state's
    /// messages are appended to the restored transcript and the frontier is
    /// reset to the entry edge, so the graph re-runs over the grown history.
    #[instrument(skip(self, initial_state), err)]
    pub async fn create_thread(
        &mut self,
        thread_id: String,
        initial_state: AgentState,
    ) -> Result<SessionInit, RunnerError> {
        let restored = if let Some(cp) = &self.checkpointer {
            cp.load_latest(&thread_id).await?
        } else {
            None
        };

        if let Some(stored) = restored {
            let mut session = restore_thread_session(&stored);
            for message in initial_state.messages.snapshot() {
                session.state.add_message(message);
            }
            session.frontier = self.graph.entry_frontier();
            self.sessions.insert(thread_id, session);
            return Ok(SessionInit::Resumed {
                checkpoint_step: stored.step,
            });
        }

        let session = ThreadSession {
            state: initial_state,
            step: 0,
            frontier: self.graph.entry_frontier(),
        };
        self.sessions.insert(thread_id.clone(), session);
        self.maybe_checkpoint(&thread_id).await;
        Ok(SessionInit::Fresh)
    }

    /// Rewind a thread to the checkpoint captured at `step`.
    ///
    /// The restored session replaces the in-memory one; subsequent
    /// supersteps fork history from that point (later checkpoints are
    /// overwritten as the new timeline advances).
    #[instrument(skip(self), err)]
    pub async fn resume_from_step(
        &mut self,
        thread_id: &str,
        step: u64,
    ) -> Result<SessionInit, RunnerError> {
        let Some(cp) = &self.checkpointer else {
            return Err(CheckpointerError::Other {
                message: "no checkpointer configured".into(),
            }
            .into());
        };
        let stored =
            cp.load_at(thread_id, step)
                .await?
                .ok_or_else(|| CheckpointerError::Other {
                    message: format!("no checkpoint at step {step} for thread {thread_id}"),
                })?;
        self.sessions
            .insert(thread_id.to_string(), restore_thread_session(&stored));
        Ok(SessionInit::Resumed {
            checkpoint_step: stored.step,
        })
    }

    /// Run a thread until its frontier drains, or fail.
    ///
    /// A parent-scoped command reaching this level is a structural error:
    /// there is no enclosing graph to hand it to.
    #[instrument(skip(self), err)]
    pub async fn run_until_complete(
        &mut self,
        thread_id: &str,
    ) -> Result<AgentState, RunnerError> {
        match self.run_to_outcome(thread_id).await? {
            RunOutcome::Completed(state) => Ok(state),
            RunOutcome::ParentCommand { origin, .. } => {
                Err(RunnerError::NoParentGraph { node: origin })
            }
        }
    }

    /// Run a thread until completion or a parent-scoped command.
    ///
    /// Subgraph wrappers call this instead of
    /// [`run_until_complete`](Self::run_until_complete) so they can catch
    /// the escaping command and re-emit it in the enclosing graph.
    pub async fn run_to_outcome(&mut self, thread_id: &str) -> Result<RunOutcome, RunnerError> {
        tracing::info!(thread = %thread_id, "run started");

        loop {
            let mut session =
                self.sessions
                    .remove(thread_id)
                    .ok_or_else(|| RunnerError::ThreadNotFound {
                        thread_id: thread_id.to_string(),
                    })?;

            if session.is_complete() {
                self.sessions.insert(thread_id.to_string(), session);
                break;
            }

            let flow = self.run_one_superstep(&mut session).await;
            let step = session.step;
            match flow {
                Err(e) => {
                    self.sessions.insert(thread_id.to_string(), session);
                    self.maybe_checkpoint(thread_id).await;
                    self.finalize_stream(thread_id, Some(step), Some(&e.to_string()));
                    return Err(e);
                }
                Ok(StepFlow::Escalate { origin, command }) => {
                    // The inner run is over; the command continues upstairs.
                    session.frontier.clear();
                    let state = session.state.clone();
                    self.sessions.insert(thread_id.to_string(), session);
                    self.maybe_checkpoint(thread_id).await;
                    return Ok(RunOutcome::ParentCommand {
                        state,
                        command,
                        origin,
                    });
                }
                Ok(StepFlow::Ran(report)) => {
                    self.sessions.insert(thread_id.to_string(), session);
                    self.maybe_checkpoint(thread_id).await;
                    if report.completed {
                        break;
                    }
                }
            }
        }

        let session =
            self.sessions
                .get(thread_id)
                .ok_or_else(|| RunnerError::ThreadNotFound {
                    thread_id: thread_id.to_string(),
                })?;
        tracing::info!(thread = %thread_id, step = session.step, "run completed");
        let final_state = session.state.clone();
        self.finalize_stream(thread_id, Some(session.step), None);
        Ok(RunOutcome::Completed(final_state))
    }

    /// Execute exactly one superstep: run the frontier, merge at the
    /// barrier, resolve routing.
    #[instrument(skip(self, session), err)]
    async fn run_one_superstep(
        &self,
        session: &mut ThreadSession,
    ) -> Result<StepFlow, RunnerError> {
        let limit = self.graph.runtime_config().recursion_limit;
        if session.step >= limit {
            return Err(RunnerError::RecursionLimitExceeded { limit });
        }
        session.step += 1;
        let step = session.step;
        tracing::debug!(step, frontier = ?session.frontier, "starting superstep");

        // Phase 1: run every frontier node concurrently against one snapshot.
        let ran_nodes: Vec<NodeKind> = session
            .frontier
            .iter()
            .filter(|k| !matches!(k, NodeKind::Start | NodeKind::End))
            .cloned()
            .collect();
        let outputs = self
            .run_nodes_concurrently(&ran_nodes, session.state.snapshot(), step)
            .await?;

        // Phase 2: barrier. Deltas merge in frontier order; versions bump
        // only for channels a delta actually touched.
        for (kind, output) in &outputs {
            let delta = output.delta();
            self.apply_delta(&mut session.state, delta)?;
            self.emit_update(kind, step, delta);
        }

        // Phase 3: routing, against the post-barrier state.
        let snapshot = session.state.snapshot();
        let mut next_frontier: Vec<NodeKind> = Vec::new();
        for (kind, output) in outputs {
            let targets = match output {
                NodeOutput::Command(command) => {
                    if command.scope == CommandScope::Parent {
                        return Ok(StepFlow::Escalate {
                            origin: kind,
                            command,
                        });
                    }
                    match command.goto {
                        Goto::Node(target) => {
                            self.require_known(&kind, &target)?;
                            vec![target]
                        }
                        Goto::End => vec![NodeKind::End],
                        Goto::FanOut(sends) => {
                            self.run_fan_out(session, &kind, sends, step).await?;
                            self.static_targets(&kind)
                        }
                    }
                }
                NodeOutput::Delta(_) => {
                    if let Some(edge) = self.graph.conditional_edge_for(&kind) {
                        vec![edge.route(&snapshot)?]
                    } else {
                        self.static_targets(&kind)
                    }
                }
            };
            for target in targets {
                if !next_frontier.contains(&target) {
                    next_frontier.push(target);
                }
            }
        }

        tracing::debug!(step, next_frontier = ?next_frontier, "superstep done");
        session.frontier = next_frontier.clone();
        let completed = session.is_complete();
        Ok(StepFlow::Ran(StepReport {
            step,
            ran_nodes,
            next_frontier,
            completed,
        }))
    }

    async fn run_nodes_concurrently(
        &self,
        kinds: &[NodeKind],
        snapshot: crate::state::StateSnapshot,
        step: u64,
    ) -> Result<Vec<(NodeKind, NodeOutput)>, RunnerError> {
        let mut handles = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let node = self
                .graph
                .nodes()
                .get(kind)
                .cloned()
                .ok_or_else(|| RunnerError::MissingNode { node: kind.clone() })?;
            let ctx = NodeContext {
                node_id: kind.to_string(),
                step,
                event_bus_sender: self.event_bus.get_sender(),
            };
            let snap = snapshot.clone();
            handles.push((
                kind.clone(),
                tokio::spawn(async move { node.run(snap, ctx).await }),
            ));
        }

        let mut outputs = Vec::with_capacity(handles.len());
        for (kind, handle) in handles {
            let output = handle
                .await?
                .map_err(|source| RunnerError::Node {
                    node: kind.clone(),
                    source,
                })?;
            outputs.push((kind, output));
        }
        Ok(outputs)
    }

    /// Dispatch every [`Send`] with its own private state, join them all,
    /// and merge their deltas into the shared state in send order.
    ///
    /// Workers see only the state their `Send` carried, never the caller's
    /// transcript. Routing intent in a worker's output is dropped; the run
    /// continues from the dispatching node's static edges.
    async fn run_fan_out(
        &self,
        session: &mut ThreadSession,
        origin: &NodeKind,
        sends: Vec<Send>,
        step: u64,
    ) -> Result<(), RunnerError> {
        let mut handles = Vec::with_capacity(sends.len());
        for send in sends {
            let node = self
                .graph
                .nodes()
                .get(&send.node)
                .cloned()
                .ok_or_else(|| RunnerError::UnknownGotoTarget {
                    from: origin.clone(),
                    target: send.node.clone(),
                })?;
            let ctx = NodeContext {
                node_id: send.node.to_string(),
                step,
                event_bus_sender: self.event_bus.get_sender(),
            };
            let snap = send.state.snapshot();
            handles.push((
                send.node,
                tokio::spawn(async move { node.run(snap, ctx).await }),
            ));
        }

        // Join barrier: every dispatch lands before the run moves on.
        for (kind, handle) in handles {
            let output = handle
                .await?
                .map_err(|source| RunnerError::Node {
                    node: kind.clone(),
                    source,
                })?;
            let delta = output.delta().clone();
            self.apply_delta(&mut session.state, &delta)?;
            self.emit_update(&kind, step, &delta);
        }
        Ok(())
    }

    fn apply_delta(&self, state: &mut AgentState, delta: &StateDelta) -> Result<(), RunnerError> {
        if delta.is_empty() {
            return Ok(());
        }
        let touched_messages = delta.messages.as_ref().is_some_and(|m| !m.is_empty());
        let touched_extra = delta.extra.as_ref().is_some_and(|m| !m.is_empty());
        self.reducers.apply_all(state, delta)?;
        if touched_messages {
            let v = state.messages.version();
            state.messages.set_version(v + 1);
        }
        if touched_extra {
            let v = state.extra.version();
            state.extra.set_version(v + 1);
        }
        Ok(())
    }

    fn emit_update(&self, kind: &NodeKind, step: u64, delta: &StateDelta) {
        if delta.is_empty() {
            return;
        }
        if self
            .event_bus
            .get_sender()
            .send(Event::update(kind.to_string(), step, delta.clone()))
            .is_err()
        {
            tracing::debug!(node = %kind, step, "update event dropped: bus disconnected");
        }
    }

    fn static_targets(&self, from: &NodeKind) -> Vec<NodeKind> {
        self.graph.edges().get(from).cloned().unwrap_or_default()
    }

    fn require_known(&self, from: &NodeKind, target: &NodeKind) -> Result<(), RunnerError> {
        let known = match target {
            NodeKind::Start | NodeKind::End => true,
            custom => self.graph.nodes().contains_key(custom),
        };
        if known {
            Ok(())
        } else {
            Err(RunnerError::UnknownGotoTarget {
                from: from.clone(),
                target: target.clone(),
            })
        }
    }

    async fn maybe_checkpoint(&self, thread_id: &str) {
        if self.autosave {
            self.checkpoint(thread_id).await;
        }
    }

    /// Persist the thread's current session, if a checkpointer exists.
    pub async fn checkpoint(&self, thread_id: &str) {
        if let Some(cp) = &self.checkpointer
            && let Some(session) = self.sessions.get(thread_id)
        {
            if let Err(e) = cp.save(Checkpoint::from_session(thread_id, session)).await {
                tracing::warn!(thread = %thread_id, error = %e, "checkpoint save failed");
            }
        }
    }

    fn finalize_stream(&self, thread_id: &str, step: Option<u64>, error: Option<&str>) {
        let message = match (step, error) {
            (Some(s), None) => format!("thread={thread_id} status=completed step={s}"),
            (Some(s), Some(e)) => format!("thread={thread_id} status=error step={s} error={e}"),
            (None, Some(e)) => format!("thread={thread_id} status=error error={e}"),
            (None, None) => format!("thread={thread_id} status=completed"),
        };
        if self
            .event_bus
            .get_sender()
            .send(Event::diagnostic(STREAM_END_SCOPE, message))
            .is_err()
        {
            tracing::debug!(thread = %thread_id, "stream end event dropped: bus disconnected");
        }
    }

    /// The in-memory session for a thread, if one exists.
    #[must_use]
    pub fn get_session(&self, thread_id: &str) -> Option<&ThreadSession> {
        self.sessions.get(thread_id)
    }

    /// All thread ids with an in-memory session.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<&String> {
        self.sessions.keys().collect()
    }

    /// Thread ids known to the persistence backend.
    pub async fn list_threads(&self) -> Result<Vec<String>, RunnerError> {
        match &self.checkpointer {
            Some(cp) => Ok(cp.list_threads().await?),
            None => Ok(Vec::new()),
        }
    }

    /// Drop a thread's session and its persisted history.
    pub async fn delete_thread(&mut self, thread_id: &str) -> Result<(), RunnerError> {
        self.sessions.remove(thread_id);
        if let Some(cp) = &self.checkpointer {
            cp.delete_thread(thread_id).await?;
        }
        Ok(())
    }
}

impl Graph {
    /// One-shot convenience: build an executor, run the state through the
    /// graph on a generated thread id, and return the final state.
    pub async fn invoke(&self, initial_state: AgentState) -> Result<AgentState, RunnerError> {
        let mut executor = GraphExecutor::new(self.clone()).await;
        let thread_id = self
            .runtime_config()
            .thread_id
            .clone()
            .unwrap_or_else(|| IdGenerator::new().generate_thread_id());
        executor.create_thread(thread_id.clone(), initial_state).await?;
        executor.run_until_complete(&thread_id).await
    }
}
