/*!
Persistence primitives for serializing runtime state and checkpoints,
shared by the SQLite checkpointer and any future durable backend.

The `Persisted*` structs are explicit serde shapes decoupled from the
in-memory types; conversion logic lives here (From / TryFrom impls) so
checkpointer code stays lean. Unknown node encodings round-trip as
`NodeKind::Custom(encoded_string)`.

This module performs no I/O.
*/

use chrono::Utc;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    channels::{Channel, ExtrasChannel, MessagesChannel},
    message::Message,
    runtimes::checkpointer::Checkpoint,
    state::AgentState,
    types::NodeKind,
};

use miette::Diagnostic;
use thiserror::Error;

/// Versioned vector channel (messages).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedVecChannel<T> {
    pub version: u32,
    pub items: Vec<T>,
}

impl<T> Default for PersistedVecChannel<T> {
    fn default() -> Self {
        Self {
            version: 1,
            items: Vec::new(),
        }
    }
}

/// Versioned map channel (extra).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedMapChannel<V> {
    pub version: u32,
    pub map: FxHashMap<String, V>,
}

impl<V> Default for PersistedMapChannel<V> {
    fn default() -> Self {
        Self {
            version: 1,
            map: FxHashMap::default(),
        }
    }
}

/// Complete persisted shape of the in-memory [`AgentState`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersistedState {
    pub messages: PersistedVecChannel<Message>,
    pub extra: PersistedMapChannel<Value>,
}

/// Full persisted checkpoint representation. Step history tables store one
/// instance of this shape per row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedCheckpoint {
    pub thread_id: String,
    pub step: u64,
    pub state: PersistedState,
    /// Frontier encoded as string vector using `NodeKind::encode()`.
    pub frontier: Vec<String>,
    /// RFC3339 string form of creation time (keeps `chrono::DateTime` out
    /// of the serialized shape).
    pub created_at: String,
}

/// Conversion and serialization errors for persistence models.
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("missing field: {0}")]
    #[diagnostic(
        code(relaygraph::persistence::missing_field),
        help("Populate the field in the persisted JSON before conversion.")
    )]
    MissingField(&'static str),

    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(relaygraph::persistence::serde),
        help("Ensure the JSON structure matches the Persisted* types.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },

    #[error("persistence error: {0}")]
    #[diagnostic(code(relaygraph::persistence::other))]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/* ---------- AgentState <-> PersistedState ---------- */

impl From<&AgentState> for PersistedState {
    fn from(s: &AgentState) -> Self {
        PersistedState {
            messages: PersistedVecChannel {
                version: s.messages.version(),
                items: s.messages.snapshot(),
            },
            extra: PersistedMapChannel {
                version: s.extra.version(),
                map: s.extra.snapshot(),
            },
        }
    }
}

impl From<PersistedState> for AgentState {
    fn from(p: PersistedState) -> Self {
        AgentState {
            messages: MessagesChannel::new(p.messages.items, p.messages.version),
            extra: ExtrasChannel::new(p.extra.map, p.extra.version),
        }
    }
}

/* ---------- Checkpoint <-> PersistedCheckpoint ---------- */

impl From<&Checkpoint> for PersistedCheckpoint {
    fn from(cp: &Checkpoint) -> Self {
        PersistedCheckpoint {
            thread_id: cp.thread_id.clone(),
            step: cp.step,
            state: PersistedState::from(&cp.state),
            frontier: cp.frontier.iter().map(|k| k.encode()).collect(),
            created_at: cp.created_at.to_rfc3339(),
        }
    }
}

impl From<PersistedCheckpoint> for Checkpoint {
    fn from(p: PersistedCheckpoint) -> Self {
        let frontier: Vec<NodeKind> = p.frontier.iter().map(|s| NodeKind::decode(s)).collect();
        let created_at = chrono::DateTime::parse_from_rfc3339(&p.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Checkpoint {
            thread_id: p.thread_id,
            step: p.step,
            state: AgentState::from(p.state),
            frontier,
            created_at,
        }
    }
}

/// Serialize any persisted shape to a JSON string, naming the field on
/// failure for diagnostics.
pub fn serialize_json<T: Serialize>(value: &T, what: &'static str) -> Result<String> {
    serde_json::to_string(value).map_err(|source| {
        tracing::warn!(field = what, error = %source, "persistence serialization failed");
        PersistenceError::Serde { source }
    })
}

/// Deserialize a persisted shape from a JSON string.
pub fn deserialize_json<T: for<'de> Deserialize<'de>>(raw: &str, what: &'static str) -> Result<T> {
    serde_json::from_str(raw).map_err(|source| {
        tracing::warn!(field = what, error = %source, "persistence deserialization failed");
        PersistenceError::Serde { source }
    })
}
