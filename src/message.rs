use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// The sender role of a [`Message`].
///
/// Serialized as the lowercase wire strings used by chat-completion APIs
/// (`"user"`, `"assistant"`, `"system"`, `"tool"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt or instruction.
    System,
    /// End-user input.
    User,
    /// Model output, possibly carrying tool calls.
    Assistant,
    /// Result of a tool invocation, paired to a call by `tool_call_id`.
    Tool,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tool invocation requested by an assistant message.
///
/// The `id` is assigned by the model and must be echoed back on the tool
/// message that answers this call; the runtime relies on that pairing to
/// keep results ordered and attributable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Model-assigned identifier, echoed on the answering tool message.
    pub id: String,
    /// Registered tool name to invoke.
    pub name: String,
    /// JSON arguments for the tool.
    pub args: Value,
}

impl ToolCall {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// A message in a conversation.
///
/// Messages are the primary data structure flowing through a graph run:
/// user inputs, assistant responses (which may request tool calls), system
/// prompts, and tool results. The message history is append-only; nodes
/// contribute new messages, never rewrite old ones.
///
/// # Examples
///
/// ```
/// use relaygraph::message::{Message, Role, ToolCall};
/// use serde_json::json;
///
/// let user = Message::user("What is 3 + 5?");
/// assert_eq!(user.role, Role::User);
///
/// let call = ToolCall::new("call_1", "add", json!({"a": 3, "b": 5}));
/// let asking = Message::assistant_with_tool_calls("", vec![call]);
/// assert!(asking.wants_tools());
///
/// let answer = Message::tool("8", "call_1", "add");
/// assert_eq!(answer.tool_call_id.as_deref(), Some("call_1"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender role.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// Tool invocations requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// On tool messages, the id of the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Optional author name (tool name on tool messages, agent name elsewhere).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Set on tool messages whose invocation failed; the content then holds
    /// the error text. Failed calls stay in the transcript so a model can
    /// react to them.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    /// Creates a plain message with the given role and content.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            is_error: false,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message with no tool calls.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates an assistant message that requests tool invocations.
    #[must_use]
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Creates a tool result message answering `tool_call_id`.
    #[must_use]
    pub fn tool(
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(tool_name.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Creates a flagged tool message for a failed invocation. The failure is
    /// recoverable: it lands in the transcript instead of aborting the run.
    #[must_use]
    pub fn tool_error(
        error_text: impl Into<String>,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            is_error: true,
            ..Self::tool(error_text, tool_call_id, tool_name)
        }
    }

    /// Attaches an author name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// Returns true for an assistant message with pending tool calls.
    #[must_use]
    pub fn wants_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// Checks the tool-call pairing discipline over a transcript.
///
/// Every tool message must reference, via `tool_call_id`, a tool call issued
/// by an *earlier* assistant message, and no call id may be answered twice.
/// Returns the offending id on violation.
pub fn validate_tool_pairing(messages: &[Message]) -> Result<(), String> {
    let mut issued: HashSet<&str> = HashSet::new();
    let mut answered: HashSet<&str> = HashSet::new();
    for message in messages {
        if message.role == Role::Assistant {
            for call in &message.tool_calls {
                issued.insert(call.id.as_str());
            }
        }
        if message.role == Role::Tool {
            let id = message.tool_call_id.as_deref().unwrap_or_default();
            if !issued.contains(id) {
                return Err(format!("tool message answers unknown call id {id:?}"));
            }
            if !answered.insert(id) {
                return Err(format!("tool call id {id:?} answered more than once"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn convenience_constructors_set_roles() {
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::assistant("hey").role, Role::Assistant);
        assert_eq!(Message::system("rules").role, Role::System);
        let tool = Message::tool("8", "call_1", "add");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.name.as_deref(), Some("add"));
    }

    #[test]
    fn wants_tools_only_for_assistant_with_calls() {
        let plain = Message::assistant("done");
        assert!(!plain.wants_tools());

        let call = ToolCall::new("c1", "add", json!({"a": 1, "b": 2}));
        let asking = Message::assistant_with_tool_calls("", vec![call]);
        assert!(asking.wants_tools());

        // A user message never requests tools, whatever it carries.
        let mut odd = Message::user("hello");
        odd.tool_calls = vec![ToolCall::new("c2", "add", json!({}))];
        assert!(!odd.wants_tools());
    }

    #[test]
    fn tool_error_is_flagged() {
        let msg = Message::tool_error("division by zero", "c1", "divide");
        assert!(msg.is_error);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.content, "division by zero");
    }

    #[test]
    fn serialization_roundtrip_keeps_tool_fields() {
        let call = ToolCall::new("c9", "search", json!({"query": "rust"}));
        let original = Message::assistant_with_tool_calls("looking it up", vec![call]);
        let json = serde_json::to_string(&original).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(original, parsed);
        assert_eq!(parsed.tool_calls[0].name, "search");
    }

    #[test]
    fn plain_message_serializes_without_tool_noise() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("tool_calls"));
        assert!(!object.contains_key("tool_call_id"));
        assert!(!object.contains_key("is_error"));
    }

    #[test]
    fn pairing_accepts_ordered_transcript() {
        let call = ToolCall::new("c1", "add", json!({"a": 1, "b": 2}));
        let transcript = vec![
            Message::user("add 1 and 2"),
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool("3", "c1", "add"),
            Message::assistant("The answer is 3."),
        ];
        assert!(validate_tool_pairing(&transcript).is_ok());
    }

    #[test]
    fn pairing_rejects_unknown_and_duplicate_ids() {
        let orphan = vec![Message::tool("3", "nope", "add")];
        assert!(validate_tool_pairing(&orphan).is_err());

        let call = ToolCall::new("c1", "add", json!({}));
        let doubled = vec![
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool("3", "c1", "add"),
            Message::tool("3", "c1", "add"),
        ];
        assert!(validate_tool_pairing(&doubled).is_err());
    }
}
