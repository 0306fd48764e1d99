use webmsg_transport::Method;
use webmsg_wire::{Seq, INITIAL_TX_SEQ};

use crate::error::{Result, SessionError};

/// Connection status of a messenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Never connected, or stopped on request.
    Disconnected,
    /// Bootstrap keep-alive sent; no session id yet.
    Connecting,
    /// Session id assigned.
    Connected,
    /// Stopped on a fatal error, no reconnect scheduled.
    Error,
    /// Stopped on a fatal error, reconnect scheduled.
    ReconnectPending,
}

/// Outcome of matching a response's session id against the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Adoption {
    /// The session had no id and took this one.
    Adopted,
    /// Same id as established.
    Matched,
    /// Different id than established.
    Mismatch { expected: String },
}

/// State of one session lifetime.
///
/// Replaced wholesale on every (re)connect.
#[derive(Debug, Clone)]
pub struct Session {
    epoch: u64,
    id: Option<String>,
    tx_seq: Seq,
    rx_seq: Option<Seq>,
    stopped: bool,
    poll_pending: bool,
    data_pending: bool,
}

impl Session {
    pub(crate) fn new(epoch: u64) -> Self {
        Self {
            epoch,
            id: None,
            tx_seq: INITIAL_TX_SEQ,
            rx_seq: None,
            stopped: false,
            poll_pending: false,
            data_pending: false,
        }
    }

    /// Placeholder used before the first connect.
    pub(crate) fn idle() -> Self {
        Self {
            stopped: true,
            ..Self::new(0)
        }
    }

    /// Identifies the session lifetime that issued a request.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Sequence number the next data request will carry.
    pub fn tx_seq(&self) -> Seq {
        self.tx_seq
    }

    /// Sequence number expected on the next poll response.
    pub fn rx_seq(&self) -> Option<Seq> {
        self.rx_seq
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn poll_pending(&self) -> bool {
        self.poll_pending
    }

    pub fn data_pending(&self) -> bool {
        self.data_pending
    }

    pub(crate) fn stop(&mut self) {
        self.stopped = true;
    }

    pub(crate) fn next_tx_seq(&mut self) -> Seq {
        self.tx_seq.advance()
    }

    pub(crate) fn set_pending(&mut self, method: Method, pending: bool) {
        match method {
            Method::Poll => self.poll_pending = pending,
            Method::SendData => self.data_pending = pending,
        }
    }

    pub(crate) fn adopt(&mut self, ses: &str) -> Adoption {
        match &self.id {
            None => {
                self.id = Some(ses.to_string());
                Adoption::Adopted
            }
            Some(id) if id == ses => Adoption::Matched,
            Some(id) => Adoption::Mismatch {
                expected: id.clone(),
            },
        }
    }

    /// Validate a poll response's sequence number and advance `rx_seq`.
    ///
    /// The first poll response seeds the counter without validation.
    pub(crate) fn accept_rx_seq(&mut self, actual: Option<i64>) -> Result<()> {
        let seq = actual.and_then(|value| Seq::try_from(value).ok());
        match (self.rx_seq, seq) {
            (None, Some(seq)) => {
                self.rx_seq = Some(seq.next());
                Ok(())
            }
            (Some(expected), Some(seq)) if expected == seq => {
                self.rx_seq = Some(seq.next());
                Ok(())
            }
            (expected, _) => Err(SessionError::SequenceMismatch { expected, actual }),
        }
    }
}
