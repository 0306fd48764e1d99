//! Session management for long-poll messaging.
//!
//! This is the "just works" layer. A [`Messenger`] owns one session at a
//! time: it bootstraps the session with a keep-alive, keeps exactly one
//! poll outstanding, serializes outbound batches, validates inbound
//! sequence numbers and routes messages to named channels.
//!
//! The [`Messenger`] is sans-IO. Requests go out through a [`Dispatch`]
//! implementation and timers through a [`Scheduler`]; completions are fed
//! back with [`Messenger::on_response`] and [`Messenger::on_timer`]. The
//! `async` feature adds [`Client`], which drives a messenger on tokio.

pub mod channel;
pub mod config;
pub mod control;
pub mod error;
pub mod messenger;
pub mod queue;
pub mod scheduler;
pub mod session;

#[cfg(feature = "async")]
pub mod client;

pub use channel::{ChannelConfig, ChannelHandle};
pub use config::{
    ConnectHandler, Disconnect, DisconnectHandler, Handlers, MessengerConfig, ReceiveHandler,
    DEFAULT_KEEP_ALIVE_PERIOD, DEFAULT_RESTART_DELAY,
};
pub use control::{ControlMessage, CMD_JOIN_CHANNEL, CMD_LEAVE_CHANNEL, CMD_WELCOME};
pub use error::{Result, SessionError};
pub use messenger::{Dispatch, Messenger, Ticket};
pub use queue::OutboundQueue;
pub use scheduler::{ManualScheduler, Scheduler, TimerKind};
pub use session::{ConnectionState, Session};

#[cfg(feature = "async")]
pub use client::{Client, ClientChannel};
