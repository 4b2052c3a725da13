#![allow(dead_code)]

use async_trait::async_trait;
use relaygraph::clients::{ChatModel, ModelError, ToolChoice};
use relaygraph::message::Message;
use relaygraph::tools::ToolSpec;
use std::sync::Mutex;

/// Scripted chat model: pops canned replies in order, errors when the
/// script runs out.
pub struct ScriptedModel {
    replies: Mutex<Vec<Message>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(
        &self,
        _messages: &[Message],
        _tools: &[ToolSpec],
        _tool_choice: ToolChoice,
    ) -> Result<Message, ModelError> {
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(ModelError::new("scripted", "script exhausted"));
        }
        Ok(replies.remove(0))
    }
}

/// Model that answers "Your name is X" if a message "I'm X" appears in its
/// context, else admits ignorance. Used for thread-memory tests.
pub struct NameRecallModel;

#[async_trait]
impl ChatModel for NameRecallModel {
    async fn invoke(
        &self,
        messages: &[Message],
        _tools: &[ToolSpec],
        _tool_choice: ToolChoice,
    ) -> Result<Message, ModelError> {
        let name = messages.iter().find_map(|m| {
            m.content
                .split("I'm ")
                .nth(1)
                .map(|rest| rest.trim_end_matches(['.', '!']).to_string())
        });
        Ok(match name {
            Some(name) => Message::assistant(format!("Your name is {name}")),
            None => Message::assistant("I don't know your name."),
        })
    }
}
