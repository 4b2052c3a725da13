//! Versioned state channels.
//!
//! Each channel owns one slice of run state together with a version counter.
//! Versions start at 1 and are bumped by the barrier only when a step
//! actually changed the channel's contents, which gives checkpoints and
//! observers a cheap change signal.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::message::Message;

/// Common surface of a versioned state channel.
pub trait Channel {
    /// The payload type stored in this channel.
    type Payload;

    /// Current version (starts at 1).
    fn version(&self) -> u32;

    /// Overwrites the version. Used by the barrier and by checkpoint restore.
    fn set_version(&mut self, version: u32);

    /// Clones the current contents.
    fn snapshot(&self) -> Self::Payload;

    /// Mutable access to the contents. Callers do not bump the version;
    /// the barrier owns that decision.
    fn get_mut(&mut self) -> &mut Self::Payload;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only conversation history.
#[derive(Clone, Debug, PartialEq)]
pub struct MessagesChannel {
    items: Vec<Message>,
    version: u32,
}

impl MessagesChannel {
    #[must_use]
    pub fn new(items: Vec<Message>, version: u32) -> Self {
        Self { items, version }
    }
}

impl Default for MessagesChannel {
    fn default() -> Self {
        Self::new(Vec::new(), 1)
    }
}

impl Channel for MessagesChannel {
    type Payload = Vec<Message>;

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn snapshot(&self) -> Vec<Message> {
        self.items.clone()
    }

    fn get_mut(&mut self) -> &mut Vec<Message> {
        &mut self.items
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Key-value scratch space shared across nodes, deep-merged at barriers.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtrasChannel {
    map: FxHashMap<String, Value>,
    version: u32,
}

impl ExtrasChannel {
    #[must_use]
    pub fn new(map: FxHashMap<String, Value>, version: u32) -> Self {
        Self { map, version }
    }
}

impl Default for ExtrasChannel {
    fn default() -> Self {
        Self::new(FxHashMap::default(), 1)
    }
}

impl Channel for ExtrasChannel {
    type Payload = FxHashMap<String, Value>;

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn snapshot(&self) -> FxHashMap<String, Value> {
        self.map.clone()
    }

    fn get_mut(&mut self) -> &mut FxHashMap<String, Value> {
        &mut self.map
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channels_start_at_version_one() {
        assert_eq!(MessagesChannel::default().version(), 1);
        assert_eq!(ExtrasChannel::default().version(), 1);
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let mut channel = ExtrasChannel::default();
        channel.get_mut().insert("k".into(), json!("v"));
        let snap = channel.snapshot();
        channel.get_mut().clear();
        assert_eq!(snap.get("k"), Some(&json!("v")));
        assert!(channel.is_empty());
    }

    #[test]
    fn mutation_does_not_touch_version() {
        let mut channel = MessagesChannel::default();
        channel.get_mut().push(Message::user("hi"));
        assert_eq!(channel.version(), 1);
        channel.set_version(2);
        assert_eq!(channel.version(), 2);
    }
}
