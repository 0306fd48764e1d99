//! Long-poll HTTP messaging client.
//!
//! webmsg keeps a bidirectional JSON message stream alive over plain HTTP
//! request/response: one standing poll carries server-to-client messages,
//! batched data requests carry client-to-server messages, and named
//! channels are multiplexed over the single session.
//!
//! # Crate Structure
//!
//! - [`wire`] — Envelopes, sequence numbers, channel tags and URLs
//! - [`transport`] — Request primitive; the `http` feature adds a reqwest binding
//! - [`session`] — Session state machine, outbound queue, timers and channels;
//!   the `async` feature adds a tokio-driven client

/// Re-export wire types.
pub mod wire {
    pub use webmsg_wire::*;
}

/// Re-export transport types.
pub mod transport {
    pub use webmsg_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use webmsg_session::*;
}
