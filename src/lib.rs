//! # Relaygraph: Graph-driven Agent Orchestration
//!
//! Relaygraph runs multi-agent workflows as explicit graphs: nodes are
//! async units of work, state flows through versioned channels, and every
//! superstep merges node outputs at a deterministic barrier before routing
//! decides what runs next.
//!
//! ## Core Concepts
//!
//! - **Messages**: role-typed conversation entries, the shared transcript
//! - **State**: append-only messages plus a deep-merged extra channel
//! - **Nodes**: async steps returning a delta or a routing [`Command`](control::Command)
//! - **Graphs**: declarative topology with static and conditional edges
//! - **Executor**: superstep engine with per-thread sessions and checkpoints
//!
//! ## Quick Start
//!
//! ```
//! use relaygraph::{
//!     graphs::GraphBuilder,
//!     message::Message,
//!     node::{Node, NodeContext, NodeError, NodeOutput, StateDelta},
//!     state::{AgentState, StateSnapshot},
//!     types::NodeKind,
//! };
//! use async_trait::async_trait;
//!
//! struct GreetingNode;
//!
//! #[async_trait]
//! impl Node for GreetingNode {
//!     async fn run(
//!         &self,
//!         _snapshot: StateSnapshot,
//!         _ctx: NodeContext,
//!     ) -> Result<NodeOutput, NodeError> {
//!         let greeting = Message::assistant("Hello! How can I help you today?");
//!         Ok(StateDelta::new().with_messages(vec![greeting]).into())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = GraphBuilder::new()
//!     .add_node("greet", GreetingNode)
//!     .add_edge(NodeKind::Start, "greet")
//!     .add_edge("greet", NodeKind::End)
//!     .compile()?;
//!
//! let final_state = graph
//!     .invoke(AgentState::new_with_user_message("Hi!"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Threads and Memory
//!
//! Conversations are keyed by thread id. Running the same thread twice
//! resumes from its latest checkpoint with the new input appended, so an
//! agent remembers earlier turns; a different thread id starts blank.
//!
//! ```rust,no_run
//! use relaygraph::runtimes::GraphExecutor;
//! use relaygraph::state::AgentState;
//! # use relaygraph::graphs::Graph;
//! # async fn example(graph: Graph) -> Result<(), Box<dyn std::error::Error>> {
//! let mut executor = GraphExecutor::new(graph).await;
//! executor
//!     .create_thread("will".into(), AgentState::new_with_user_message("Hi, I'm Will"))
//!     .await?;
//! executor.run_until_complete("will").await?;
//!
//! // Same thread: the agent still has the earlier exchange.
//! executor
//!     .create_thread("will".into(), AgentState::new_with_user_message("What's my name?"))
//!     .await?;
//! executor.run_until_complete("will").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`message`] - Message and tool-call types
//! - [`state`] - Versioned state and snapshots
//! - [`channels`] - Channel storage and versioning
//! - [`reducers`] - Barrier merge strategies
//! - [`node`] - Node trait and execution primitives
//! - [`control`] - Commands, routing scopes, and fan-out sends
//! - [`tools`] - Tool registry and the tool-executing node
//! - [`graphs`] - Graph definition, conditional routing, compilation
//! - [`runtimes`] - Executor, thread sessions, and checkpointing
//! - [`agents`] - Subgraphs, hand-offs, supervisor, ReAct loop
//! - [`clients`] - Model/retriever/database seams
//! - [`event_bus`] - Event streaming to pluggable sinks
//! - [`telemetry`] - Tracing setup and event formatting

pub mod agents;
pub mod channels;
pub mod clients;
pub mod config;
pub mod control;
pub mod event_bus;
pub mod graphs;
pub mod message;
pub mod node;
pub mod reducers;
pub mod runtimes;
pub mod state;
pub mod telemetry;
pub mod tools;
pub mod types;
pub mod utils;
