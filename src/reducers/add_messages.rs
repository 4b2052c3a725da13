use super::Reducer;
use crate::{channels::Channel, node::StateDelta, state::AgentState};

/// Appends delta messages to the history in the order they arrive.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct AddMessages;

impl Reducer for AddMessages {
    fn apply(&self, state: &mut AgentState, update: &StateDelta) {
        if let Some(messages) = &update.messages
            && !messages.is_empty()
        {
            state.messages.get_mut().extend(messages.iter().cloned());
        }
    }
}
