//! Named logical channels multiplexed over one session.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use webmsg_wire::{Inbound, Object};

use crate::config::{Disconnect, DisconnectHandler, ReceiveHandler};
use crate::control::ControlMessage;

/// Handlers for one channel. Unset handlers fall back to logging.
#[derive(Default)]
pub struct ChannelConfig {
    pub on_receive: Option<ReceiveHandler>,
    pub on_disconnect: Option<DisconnectHandler>,
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_receive(mut self, handler: impl FnMut(Value) + Send + 'static) -> Self {
        self.on_receive = Some(Box::new(handler));
        self
    }

    pub fn on_disconnect(mut self, handler: impl FnMut(&Disconnect) + Send + 'static) -> Self {
        self.on_disconnect = Some(Box::new(handler));
        self
    }
}

impl fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("on_receive", &self.on_receive.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .finish()
    }
}

/// Handle to a registered channel.
///
/// Two handles are equal only if they come from the same registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    id: u64,
    name: Arc<str>,
}

impl ChannelHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

struct Channel {
    handle: ChannelHandle,
    join: Object,
    on_receive: Option<ReceiveHandler>,
    on_disconnect: Option<DisconnectHandler>,
}

/// Registry of channels, in registration order.
#[derive(Default)]
pub(crate) struct ChannelMux {
    channels: Vec<Channel>,
    next_id: u64,
}

impl ChannelMux {
    pub(crate) fn find(&self, name: &str) -> Option<&ChannelHandle> {
        self.channels
            .iter()
            .map(|channel| &channel.handle)
            .find(|handle| handle.name() == name)
    }

    pub(crate) fn register(
        &mut self,
        name: &str,
        join: Object,
        config: ChannelConfig,
    ) -> ChannelHandle {
        self.next_id += 1;
        let handle = ChannelHandle {
            id: self.next_id,
            name: Arc::from(name),
        };
        self.channels.push(Channel {
            handle: handle.clone(),
            join,
            on_receive: config.on_receive,
            on_disconnect: config.on_disconnect,
        });
        handle
    }

    /// Unregister a channel. Returns false if the handle is stale.
    pub(crate) fn remove(&mut self, handle: &ChannelHandle) -> bool {
        let before = self.channels.len();
        self.channels.retain(|channel| channel.handle != *handle);
        self.channels.len() != before
    }

    pub(crate) fn handles(&self) -> impl Iterator<Item = &ChannelHandle> {
        self.channels.iter().map(|channel| &channel.handle)
    }

    /// Deliver to the channel named by the message's tag.
    ///
    /// Returns the message back if no registered channel claims it.
    pub(crate) fn route(&mut self, inbound: Inbound) -> Option<Inbound> {
        let Some(name) = inbound.channel.as_deref() else {
            return Some(inbound);
        };
        let Some(channel) = self
            .channels
            .iter_mut()
            .find(|channel| channel.handle.name() == name)
        else {
            return Some(inbound);
        };

        match &mut channel.on_receive {
            Some(handler) => handler(inbound.message),
            None => tracing::debug!(channel = name, "unhandled channel message"),
        }
        None
    }

    /// Run every channel's disconnect handler, in registration order.
    pub(crate) fn notify_disconnect(&mut self, disconnect: &Disconnect) {
        for channel in &mut self.channels {
            match &mut channel.on_disconnect {
                Some(handler) => handler(disconnect),
                None => tracing::debug!(
                    channel = channel.handle.name(),
                    code = disconnect.code,
                    "channel disconnected"
                ),
            }
        }
    }

    /// Join requests for every channel, with its original join fields.
    pub(crate) fn join_messages(&self) -> Vec<Value> {
        self.channels
            .iter()
            .map(|channel| {
                ControlMessage::join_channel(channel.handle.name(), channel.join.clone())
                    .into_message()
            })
            .collect()
    }
}
