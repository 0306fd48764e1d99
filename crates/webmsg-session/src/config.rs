use std::fmt;
use std::time::Duration;

use serde_json::Value;
use webmsg_transport::Credentials;
use webmsg_wire::DEFAULT_BASE_PATH;

/// Period of the keep-alive timer.
pub const DEFAULT_KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(60);

/// Delay before an automatic reconnect attempt.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);

/// Called once per session with the server-assigned session id.
pub type ConnectHandler = Box<dyn FnMut(&str) + Send>;

/// Called when a session ends on an error.
pub type DisconnectHandler = Box<dyn FnMut(&Disconnect) + Send>;

/// Called for every inbound message routed to the handler's owner.
pub type ReceiveHandler = Box<dyn FnMut(Value) + Send>;

/// Why a session ended, as reported to disconnect handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    /// Human-readable description.
    pub message: String,
    /// HTTP status, 0 when the request got none, or a negative protocol code.
    pub code: i32,
}

/// Connection settings of a messenger.
#[derive(Clone)]
pub struct MessengerConfig {
    /// Base URL of the messenger endpoint (e.g. `http://host:8000/_webmsg`).
    pub url: String,
    /// User name passed opaquely to the transport.
    pub user: Option<String>,
    /// Password passed opaquely to the transport. Never logged.
    pub password: Option<String>,
    /// Reconnect automatically after a fatal error.
    pub autorestart: bool,
    /// Period of the keep-alive timer.
    pub keep_alive_period: Duration,
    /// Delay before an automatic reconnect.
    pub restart_delay: Duration,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BASE_PATH.to_string(),
            user: None,
            password: None,
            autorestart: false,
            keep_alive_period: DEFAULT_KEEP_ALIVE_PERIOD,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }
}

impl MessengerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.user = Some(user.into());
        self.password = password;
        self
    }

    pub fn with_autorestart(mut self, autorestart: bool) -> Self {
        self.autorestart = autorestart;
        self
    }

    pub fn with_keep_alive_period(mut self, period: Duration) -> Self {
        self.keep_alive_period = period;
        self
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// Credentials for the transport, if a user is configured.
    pub fn credentials(&self) -> Option<Credentials> {
        self.user
            .as_ref()
            .map(|user| Credentials::new(user.clone(), self.password.clone()))
    }
}

impl fmt::Debug for MessengerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("MessengerConfig");
        dbg.field("url", &self.url).field("user", &self.user);
        if let Some(password) = &self.password {
            dbg.field(
                "password",
                &format_args!("<redacted:{} bytes>", password.len()),
            );
        } else {
            dbg.field("password", &Option::<String>::None);
        }
        dbg.field("autorestart", &self.autorestart)
            .field("keep_alive_period", &self.keep_alive_period)
            .field("restart_delay", &self.restart_delay)
            .finish()
    }
}

/// Transport-level callbacks.
///
/// Unset handlers fall back to logging.
#[derive(Default)]
pub struct Handlers {
    pub on_connect: Option<ConnectHandler>,
    pub on_disconnect: Option<DisconnectHandler>,
    pub on_receive: Option<ReceiveHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(mut self, handler: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_connect = Some(Box::new(handler));
        self
    }

    pub fn on_disconnect(mut self, handler: impl FnMut(&Disconnect) + Send + 'static) -> Self {
        self.on_disconnect = Some(Box::new(handler));
        self
    }

    pub fn on_receive(mut self, handler: impl FnMut(Value) + Send + 'static) -> Self {
        self.on_receive = Some(Box::new(handler));
        self
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_receive", &self.on_receive.is_some())
            .finish()
    }
}
