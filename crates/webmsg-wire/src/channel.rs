//! Channel tagging.
//!
//! Logical channels are multiplexed over one session by a `CHANNEL` key on
//! object messages. Messages without the key (or that are not objects)
//! belong to the root channel.

use serde_json::{Map, Value};

/// Message key that names the logical channel.
pub const CHANNEL_KEY: &str = "CHANNEL";

/// Name of the root channel. Never registered as a named channel.
pub const ROOT_CHANNEL: &str = "";

/// A JSON object message.
pub type Object = Map<String, Value>;

/// Stamp `message` with a channel name, replacing any existing tag.
pub fn tag(mut message: Object, channel: &str) -> Value {
    message.insert(CHANNEL_KEY.to_string(), Value::String(channel.to_string()));
    Value::Object(message)
}

/// An inbound message with its channel tag extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    /// Channel named by the message, if it carries a string `CHANNEL` key.
    pub channel: Option<String>,
    /// The message as received, tag included.
    pub message: Value,
}

impl Inbound {
    /// True if the message targets the root channel.
    pub fn is_root(&self) -> bool {
        self.channel.as_deref().is_none_or(str::is_empty)
    }
}

impl From<Value> for Inbound {
    fn from(message: Value) -> Self {
        let channel = message
            .as_object()
            .and_then(|obj| obj.get(CHANNEL_KEY))
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { channel, message }
    }
}
