/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The response body is not a valid envelope.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A sequence number is outside the 31-bit range.
    #[error("sequence number {0} out of range (0..=0x7FFFFFFF)")]
    SeqOutOfRange(i64),
}

pub type Result<T> = std::result::Result<T, WireError>;
