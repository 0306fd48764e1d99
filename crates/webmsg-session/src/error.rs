use webmsg_transport::TransportError;
use webmsg_wire::{Seq, WireError};

/// Errors that end a session.
///
/// Every variant is fatal to the session it happened on. They are never
/// returned to callers of `send`/`connect`; they surface through the
/// disconnect handlers with [`SessionError::code`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server answered with a non-success status.
    #[error("communication error (status {status})")]
    Status { status: u16 },

    /// The request never produced a status.
    #[error("communication error: {0}")]
    Request(#[from] TransportError),

    /// A response named a different session than the established one.
    #[error("communication error (bad session: expected {expected}, got {actual})")]
    SessionMismatch { expected: String, actual: String },

    /// A poll response arrived out of order.
    #[error(
        "communication error (bad sequence: expected {}, got {})",
        display_opt(expected),
        display_opt(actual)
    )]
    SequenceMismatch {
        expected: Option<Seq>,
        actual: Option<i64>,
    },

    /// The response body is not a valid envelope.
    #[error("communication error (malformed response: {0})")]
    MalformedResponse(#[source] WireError),

    /// An outbound envelope could not be serialized.
    #[error("failed to encode data request: {0}")]
    Encode(#[source] WireError),

    /// The client task is gone.
    #[error("messenger client has shut down")]
    Closed,
}

impl SessionError {
    /// Status code reported to disconnect handlers.
    ///
    /// Transport failures report the raw HTTP status (0 when there was
    /// none); protocol violations use negative codes.
    pub fn code(&self) -> i32 {
        match self {
            SessionError::Status { status } => i32::from(*status),
            SessionError::Request(_) => 0,
            SessionError::SessionMismatch { .. } => -1,
            SessionError::SequenceMismatch { .. } => -2,
            SessionError::MalformedResponse(_) => -3,
            SessionError::Encode(_) => -4,
            SessionError::Closed => -5,
        }
    }
}

fn display_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "none".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_protocol_conventions() {
        assert_eq!(SessionError::Status { status: 503 }.code(), 503);
        assert_eq!(SessionError::Request(TransportError::Shutdown).code(), 0);
        assert_eq!(
            SessionError::SessionMismatch {
                expected: "S1".into(),
                actual: "S2".into()
            }
            .code(),
            -1
        );
        assert_eq!(
            SessionError::SequenceMismatch {
                expected: Seq::new(8),
                actual: Some(9)
            }
            .code(),
            -2
        );
    }

    #[test]
    fn sequence_mismatch_message_handles_missing_values() {
        let err = SessionError::SequenceMismatch {
            expected: Seq::new(8),
            actual: None,
        };
        assert_eq!(
            err.to_string(),
            "communication error (bad sequence: expected 8, got none)"
        );
    }
}
