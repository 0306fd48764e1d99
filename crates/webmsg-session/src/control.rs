use serde::{Deserialize, Serialize};
use serde_json::Value;
use webmsg_wire::{tag, Object, CHANNEL_KEY, ROOT_CHANNEL};

/// Root-channel command: subscribe this session to a channel.
pub const CMD_JOIN_CHANNEL: &str = "join_channel";
/// Root-channel command: unsubscribe this session from a channel.
pub const CMD_LEAVE_CHANNEL: &str = "leave_channel";
/// Root-channel command sent by the server to greet a new session.
pub const CMD_WELCOME: &str = "welcome";

/// A command exchanged on the root channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Any other fields. On the way out these never override the fields above.
    #[serde(flatten)]
    pub extra: Object,
}

impl ControlMessage {
    /// Create a join request, carrying extra join fields.
    pub fn join_channel(name: &str, extra: Object) -> Self {
        Self {
            cmd: CMD_JOIN_CHANNEL.to_string(),
            channel: Some(name.to_string()),
            session_id: None,
            extra,
        }
    }

    /// Create a leave request.
    pub fn leave_channel(name: &str) -> Self {
        Self {
            cmd: CMD_LEAVE_CHANNEL.to_string(),
            channel: Some(name.to_string()),
            session_id: None,
            extra: Object::new(),
        }
    }

    /// Parse a root-channel message, if it is a command.
    pub fn parse(message: &Value) -> Option<Self> {
        message.get("cmd")?;
        serde_json::from_value(message.clone()).ok()
    }

    pub fn is_welcome(&self) -> bool {
        self.cmd == CMD_WELCOME
    }

    /// True for an outgoing root-channel join or leave request.
    pub fn is_membership(message: &Value) -> bool {
        let root = message
            .get(CHANNEL_KEY)
            .and_then(Value::as_str)
            .is_none_or(str::is_empty);
        root && matches!(
            message.get("cmd").and_then(Value::as_str),
            Some(CMD_JOIN_CHANNEL | CMD_LEAVE_CHANNEL)
        )
    }

    /// Build the wire message, tagged for the root channel.
    pub fn into_message(self) -> Value {
        let mut obj = self.extra;
        obj.insert("cmd".to_string(), Value::String(self.cmd));
        if let Some(channel) = self.channel {
            obj.insert("channel".to_string(), Value::String(channel));
        }
        if let Some(session_id) = self.session_id {
            obj.insert("session_id".to_string(), Value::String(session_id));
        }
        tag(obj, ROOT_CHANNEL)
    }
}
