use std::fmt;

use webmsg_session::{Disconnect, SessionError};
use webmsg_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const PROTOCOL_ERROR: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Exit code for a session disconnect code (HTTP status, 0, or negative protocol code).
fn disconnect_code(code: i32) -> i32 {
    match code {
        0 => TRANSPORT_ERROR,
        401 | 403 | 407 => PERMISSION_DENIED,
        408 | 504 => TIMEOUT,
        -3..=-1 => PROTOCOL_ERROR,
        -4 => INTERNAL,
        _ => FAILURE,
    }
}

pub fn disconnect_error(context: &str, disconnect: &Disconnect) -> CliError {
    CliError::new(
        disconnect_code(disconnect.code),
        format!("{context}: {} (code {})", disconnect.message, disconnect.code),
    )
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidUrl(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Request(err) => transport_error(context, err),
        SessionError::Closed => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(disconnect_code(other.code()), format!("{context}: {other}")),
    }
}
