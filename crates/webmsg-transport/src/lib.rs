//! Request/response transport abstraction.
//!
//! The messenger only needs one primitive: issue a request, and some time
//! later receive a status and a body. This crate defines that primitive
//! ([`Transport`]) and its request/response types.
//!
//! - [`http`] — `reqwest`-backed binding (behind the `http` feature)

pub mod error;
pub mod traits;

#[cfg(feature = "http")]
pub mod http;

pub use error::{Result, TransportError};
pub use traits::{Credentials, Method, Request, Response, Transport};

#[cfg(feature = "http")]
pub use http::HttpTransport;
