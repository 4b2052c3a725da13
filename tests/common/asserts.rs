use relaygraph::channels::Channel;
use relaygraph::state::AgentState;

#[allow(dead_code)]
pub fn assert_message_contains(state: &AgentState, needle: &str) {
    let msgs = state.messages.snapshot();
    let found = msgs.iter().any(|m| m.content.contains(needle));
    assert!(
        found,
        "expected at least one message containing '{needle}', got: {:?}",
        msgs
    );
}

#[allow(dead_code)]
pub fn assert_extra_has(state: &AgentState, key: &str) {
    let extra = state.extra.snapshot();
    assert!(
        extra.contains_key(key),
        "expected extra to have key '{key}', got keys: {:?}",
        extra.keys().collect::<Vec<_>>()
    );
}
