//! Event fan-out: a flume-backed bus with pluggable sinks.
//!
//! Runs emit [`Event`]s (node messages, runtime diagnostics, and per-node
//! state updates); the [`EventBus`] broadcasts them to every configured
//! [`EventSink`].

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::EventBus;
pub use event::{DiagnosticEvent, Event, NodeEvent, UpdateEvent, STREAM_END_SCOPE};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
