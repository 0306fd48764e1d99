use std::fmt;

use clap::{Args, Subcommand};
use webmsg_session::MessengerConfig;
use webmsg_transport::HttpTransport;

use crate::exit::{transport_error, CliResult};
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and print received messages.
    Listen(ListenArgs),
    /// Connect, send a single message and wait until it is delivered.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format).await,
        Command::Send(args) => send::run(args, format).await,
        Command::Version(args) => version::run(args),
    }
}

/// Endpoint and session settings shared by every connecting command.
#[derive(Args)]
pub struct ConnectArgs {
    /// Messenger endpoint (e.g. http://localhost:8000/_webmsg).
    #[arg(env = "WEBMSG_URL")]
    pub url: String,
    /// HTTP Basic auth user.
    #[arg(long, env = "WEBMSG_USER")]
    pub user: Option<String>,
    /// HTTP Basic auth password.
    #[arg(long, env = "WEBMSG_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Reconnect after a fatal error.
    #[arg(long)]
    pub autorestart: bool,
    /// Keep-alive period (e.g. 60s, 500ms).
    #[arg(long, default_value = "60s")]
    pub keep_alive: String,
    /// Delay before an automatic reconnect (e.g. 5s).
    #[arg(long, default_value = "5s")]
    pub restart_delay: String,
    /// Per-request timeout; must exceed the server's poll hold time.
    #[arg(long, default_value = "120s")]
    pub request_timeout: String,
}

impl ConnectArgs {
    pub fn messenger_config(&self) -> CliResult<MessengerConfig> {
        let mut config = MessengerConfig::new(self.url.clone())
            .with_autorestart(self.autorestart)
            .with_keep_alive_period(send::parse_duration(&self.keep_alive)?)
            .with_restart_delay(send::parse_duration(&self.restart_delay)?);
        if let Some(user) = &self.user {
            config = config.with_credentials(user.clone(), self.password.clone());
        }
        Ok(config)
    }

    pub fn transport(&self) -> CliResult<HttpTransport> {
        let timeout = send::parse_duration(&self.request_timeout)?;
        HttpTransport::with_timeout(timeout).map_err(|err| transport_error("client setup failed", err))
    }
}

impl fmt::Debug for ConnectArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectArgs")
            .field("url", &self.url)
            .field("user", &self.user)
            .field(
                "password",
                &self.password.as_ref().map(|p| format!("<redacted:{} bytes>", p.len())),
            )
            .field("autorestart", &self.autorestart)
            .field("keep_alive", &self.keep_alive)
            .field("restart_delay", &self.restart_delay)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Join a channel (repeatable).
    #[arg(long = "channel", short = 'c', value_name = "NAME")]
    pub channels: Vec<String>,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Join this channel and send on it. Requires a JSON object payload.
    #[arg(long, short = 'c', value_name = "NAME")]
    pub channel: Option<String>,
    /// JSON payload.
    #[arg(long, conflicts_with = "data", required_unless_present = "data")]
    pub json: Option<String>,
    /// String payload.
    #[arg(long, conflicts_with = "json")]
    pub data: Option<String>,
    /// Maximum time to wait for delivery (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
