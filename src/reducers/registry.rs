use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::{
    node::StateDelta,
    reducers::{AddMessages, MergeExtra, Reducer, ReducerError},
    state::AgentState,
    types::ChannelType,
};
use tracing::instrument;

/// Maps each state channel to the reducers that fold deltas into it.
///
/// The default registry wires [`AddMessages`] to the message channel and
/// [`MergeExtra`] to the extra channel. Multiple reducers per channel are
/// applied in registration order.
#[derive(Clone)]
pub struct ReducerRegistry {
    reducer_map: FxHashMap<ChannelType, Vec<Arc<dyn Reducer>>>,
}

/// Skip check: does this delta carry anything for the channel?
fn channel_guard(channel: &ChannelType, delta: &StateDelta) -> bool {
    match channel {
        ChannelType::Message => delta.messages.as_ref().is_some_and(|v| !v.is_empty()),
        ChannelType::Extra => delta.extra.as_ref().is_some_and(|m| !m.is_empty()),
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        Self::new()
            .with_reducer(ChannelType::Message, Arc::new(AddMessages))
            .with_reducer(ChannelType::Extra, Arc::new(MergeExtra))
    }
}

impl ReducerRegistry {
    /// Creates an empty registry. Most callers want [`Default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            reducer_map: FxHashMap::default(),
        }
    }

    /// Registers a reducer for a channel.
    pub fn register(&mut self, channel: ChannelType, reducer: Arc<dyn Reducer>) -> &mut Self {
        self.reducer_map.entry(channel).or_default().push(reducer);
        self
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with_reducer(mut self, channel: ChannelType, reducer: Arc<dyn Reducer>) -> Self {
        self.register(channel, reducer);
        self
    }

    #[instrument(skip(self, state, delta), err)]
    pub fn try_update(
        &self,
        channel_type: ChannelType,
        state: &mut AgentState,
        delta: &StateDelta,
    ) -> Result<(), ReducerError> {
        if !channel_guard(&channel_type, delta) {
            return Ok(());
        }

        if let Some(reducers) = self.reducer_map.get(&channel_type) {
            for reducer in reducers {
                reducer.apply(state, delta);
            }
            Ok(())
        } else {
            Err(ReducerError::UnknownChannel(channel_type))
        }
    }

    /// Applies a merged delta across every registered channel; the guard
    /// skips channels the delta does not touch.
    #[instrument(skip(self, state, delta), err)]
    pub fn apply_all(
        &self,
        state: &mut AgentState,
        delta: &StateDelta,
    ) -> Result<(), ReducerError> {
        for channel in self.reducer_map.keys() {
            self.try_update(channel.clone(), state, delta)?;
        }
        Ok(())
    }
}
