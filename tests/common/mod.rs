pub mod asserts;
pub mod models;
pub mod nodes;

pub use asserts::*;
pub use models::*;
pub use nodes::*;

use relaygraph::state::AgentState;

#[allow(dead_code)]
pub fn state_with_user(text: &str) -> AgentState {
    AgentState::new_with_user_message(text)
}
