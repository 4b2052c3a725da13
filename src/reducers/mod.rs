mod add_messages;
mod merge_extra;
mod registry;

pub use add_messages::AddMessages;
pub use merge_extra::MergeExtra;
pub use registry::ReducerRegistry;

use crate::node::StateDelta;
use crate::state::AgentState;
use crate::types::ChannelType;
use miette::Diagnostic;
use thiserror::Error;

/// A reducer folds one [`StateDelta`] into the run state for its channel.
///
/// Reducers define the merge discipline: messages append (history is never
/// rewritten), extras deep-merge with incoming keys winning. Version bumps
/// are not a reducer concern; the barrier compares before/after contents.
pub trait Reducer: Send + Sync {
    fn apply(&self, state: &mut AgentState, update: &StateDelta);
}

#[derive(Debug, Error, Diagnostic)]
pub enum ReducerError {
    #[error("no reducers registered for channel: {0:?}")]
    #[diagnostic(code(relaygraph::reducers::unknown_channel))]
    UnknownChannel(ChannelType),
}
