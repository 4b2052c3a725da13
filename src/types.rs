//! Core identifiers for graph nodes and state channels.
//!
//! - [`NodeKind`]: identifies a node in a workflow graph, including the
//!   virtual `Start` and `End` endpoints.
//! - [`ChannelType`]: identifies a state channel for reducer dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `Start` and `End` are virtual: they are never implemented or executed.
/// `Start` anchors the entry edges of a graph; routing to `End` finishes a
/// run. Everything else is a [`Custom`](Self::Custom) node named by the
/// application.
///
/// # Examples
///
/// ```rust
/// use relaygraph::types::NodeKind;
///
/// let model: NodeKind = "model".into();
/// assert_eq!(model, NodeKind::Custom("model".to_string()));
///
/// // Persistence round-trip
/// let encoded = model.encode();
/// assert_eq!(NodeKind::decode(&encoded), model);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Virtual entry point; the initial frontier is the set of `Start` edge
    /// targets.
    Start,
    /// Virtual terminal; a frontier consisting only of `End` completes the run.
    End,
    /// Application node identified by a user-defined string.
    Custom(String),
}

impl NodeKind {
    /// Encode into the persisted string form: `"Start"`, `"End"`, or
    /// `"Custom:<name>"`.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(s) => format!("Custom:{s}"),
        }
    }

    /// Decode a persisted string form. Unrecognized formats fall back to
    /// `Custom` so older checkpoints keep loading.
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeKind::Start
        } else if s == "End" {
            NodeKind::End
        } else if let Some(rest) = s.strip_prefix("Custom:") {
            NodeKind::Custom(rest.to_string())
        } else {
            NodeKind::Custom(s.to_string())
        }
    }

    /// Returns `true` if this is the virtual [`Start`](Self::Start) node.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` if this is the virtual [`End`](Self::End) node.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` if this is an application node.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

// Allow string literals where a NodeKind is expected.
impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

/// Identifies a state channel for reducer dispatch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// Append-only conversation history.
    Message,
    /// Key-value scratch space, deep-merged across steps.
    Extra,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::Extra => write!(f, "extra"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        for kind in [
            NodeKind::Start,
            NodeKind::End,
            NodeKind::Custom("supervisor".into()),
        ] {
            assert_eq!(NodeKind::decode(&kind.encode()), kind);
        }
    }

    #[test]
    fn decode_tolerates_bare_names() {
        assert_eq!(
            NodeKind::decode("legacy_node"),
            NodeKind::Custom("legacy_node".into())
        );
    }

    #[test]
    fn from_str_maps_virtual_names() {
        assert_eq!(NodeKind::from("Start"), NodeKind::Start);
        assert_eq!(NodeKind::from("End"), NodeKind::End);
        assert!(NodeKind::from("model").is_custom());
    }
}
