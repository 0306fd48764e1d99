/// Errors that can occur while issuing a request.
///
/// A response with a non-success status is *not* an error at this layer;
/// only requests that never produced a status end up here.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be completed (connection refused, reset, timed out).
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The request URL was rejected before anything was sent.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
