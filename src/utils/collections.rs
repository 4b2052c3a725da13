//! Collection constructors shared across the crate.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Creates an empty map shaped for the extra channel.
#[must_use]
pub fn new_extra_map() -> FxHashMap<String, Value> {
    FxHashMap::default()
}
