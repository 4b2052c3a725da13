use super::Reducer;
use crate::utils::json_merge::deep_merge;
use crate::{channels::Channel, node::StateDelta, state::AgentState};

/// Deep-merges delta extras into the extra channel.
///
/// Nested JSON objects merge recursively; on a scalar or type conflict the
/// incoming value wins. Keys are applied in sorted order so concurrent node
/// outputs merge deterministically.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct MergeExtra;

impl Reducer for MergeExtra {
    fn apply(&self, state: &mut AgentState, update: &StateDelta) {
        if let Some(extras_update) = &update.extra
            && !extras_update.is_empty()
        {
            let mut keys: Vec<&String> = extras_update.keys().collect();
            keys.sort();
            let state_map = state.extra.get_mut();
            for key in keys {
                let incoming = extras_update[key].clone();
                match state_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, incoming),
                    None => {
                        state_map.insert(key.clone(), incoming);
                    }
                }
            }
        }
    }
}
