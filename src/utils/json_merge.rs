//! Recursive JSON merging used by the extra-channel reducer.

use serde_json::Value;

/// Deep-merges `incoming` into `existing`.
///
/// Object values merge key by key, recursing into nested objects. Anything
/// else (scalars, arrays, type mismatches) is replaced wholesale by the
/// incoming value.
///
/// # Examples
///
/// ```rust
/// use relaygraph::utils::json_merge::deep_merge;
/// use serde_json::json;
///
/// let mut base = json!({"a": 1, "b": {"x": 10}});
/// deep_merge(&mut base, json!({"b": {"y": 20}, "c": 3}));
/// assert_eq!(base, json!({"a": 1, "b": {"x": 10, "y": 20}, "c": 3}));
/// ```
pub fn deep_merge(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(base), Value::Object(update)) => {
            for (key, value) in update {
                match base.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_conflict_takes_incoming() {
        let mut base = json!({"n": 1});
        deep_merge(&mut base, json!({"n": 2}));
        assert_eq!(base, json!({"n": 2}));
    }

    #[test]
    fn arrays_replace_not_concatenate() {
        let mut base = json!({"xs": [1, 2]});
        deep_merge(&mut base, json!({"xs": [3]}));
        assert_eq!(base, json!({"xs": [3]}));
    }

    #[test]
    fn type_mismatch_replaces() {
        let mut base = json!({"v": {"inner": true}});
        deep_merge(&mut base, json!({"v": 7}));
        assert_eq!(base, json!({"v": 7}));
    }
}
