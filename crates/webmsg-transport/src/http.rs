//! [`reqwest`]-backed implementation of [`Transport`].

use std::time::Duration;

use futures_core::future::BoxFuture;

use crate::error::{Result, TransportError};
use crate::traits::{Method, Request, Response, Transport};

/// HTTP binding: polls are `GET`, data requests are `POST` with a JSON body.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with default client settings.
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// Create a transport whose requests time out after `timeout`.
    ///
    /// Keep this above the server's long-poll hold time, or every idle poll
    /// ends the session.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Request {
                url: String::new(),
                reason: err.to_string(),
            })?;
        Ok(Self { inner })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn issue(&self, request: Request) -> BoxFuture<'static, Result<Response>> {
        let url = request.url.clone();
        let mut builder = match request.method {
            Method::Poll => self.inner.get(&request.url),
            Method::SendData => self
                .inner
                .post(&request.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json"),
        };
        if let Some(creds) = &request.credentials {
            builder = builder.basic_auth(&creds.user, creds.password.as_deref());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        Box::pin(async move {
            let resp = builder.send().await.map_err(|err| request_error(&url, err))?;
            let status = resp.status().as_u16();
            let body = resp.bytes().await.map_err(|err| request_error(&url, err))?;
            tracing::trace!(%url, status, size = body.len(), "http response");
            Ok(Response { status, body })
        })
    }
}

fn request_error(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        return TransportError::InvalidUrl(url.to_string());
    }
    TransportError::Request {
        url: url.to_string(),
        reason: err.to_string(),
    }
}
