//! Wire-level pieces of the long-poll messenger protocol.
//!
//! Everything that crosses the HTTP boundary is defined here:
//! - 31-bit wrapping sequence numbers ([`Seq`])
//! - Data request and response envelopes (JSON)
//! - The `CHANNEL` tag used to multiplex logical channels
//! - Session URL addressing
//!
//! No I/O happens in this crate.

pub mod address;
pub mod channel;
pub mod envelope;
pub mod error;
pub mod seq;

pub use address::{session_url, DEFAULT_BASE_PATH, NEW_SESSION};
pub use channel::{tag, Inbound, Object, CHANNEL_KEY, ROOT_CHANNEL};
pub use envelope::{decode_response, encode_data, DataEnvelope, ResponseEnvelope};
pub use error::{Result, WireError};
pub use seq::{Seq, INITIAL_TX_SEQ, SEQ_MAX};
