use std::fmt;

use bytes::Bytes;
use futures_core::future::BoxFuture;

use crate::error::Result;

/// The two kinds of request the messenger issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Long-lived request that completes when inbound messages are available.
    Poll,
    /// Request carrying outbound messages or a keep-alive.
    SendData,
}

/// Opaque credentials handed to the transport.
///
/// Never logged; `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: Option<String>) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Credentials");
        dbg.field("user", &self.user);
        if let Some(password) = &self.password {
            dbg.field(
                "password",
                &format_args!("<redacted:{} bytes>", password.len()),
            );
        } else {
            dbg.field("password", &Option::<String>::None);
        }
        dbg.finish()
    }
}

/// A request ready to be issued.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    /// JSON body. Always `None` for polls.
    pub body: Option<Bytes>,
    pub credentials: Option<Credentials>,
}

impl Request {
    /// A poll request (no body).
    pub fn poll(url: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            method: Method::Poll,
            url: url.into(),
            body: None,
            credentials,
        }
    }

    /// A data request with a JSON body.
    pub fn send_data(
        url: impl Into<String>,
        body: impl Into<Bytes>,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            method: Method::SendData,
            url: url.into(),
            body: Some(body.into()),
            credentials,
        }
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request primitive the messenger is layered on.
///
/// `issue` returns immediately; the returned future resolves once the
/// remote side answers. Timeouts are the implementation's business.
pub trait Transport: Send + Sync + 'static {
    fn issue(&self, request: Request) -> BoxFuture<'static, Result<Response>>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn issue(&self, request: Request) -> BoxFuture<'static, Result<Response>> {
        (**self).issue(request)
    }
}
