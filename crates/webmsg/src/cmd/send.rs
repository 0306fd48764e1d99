use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time;
use tracing::debug;
use webmsg_session::{ChannelConfig, Client, Handlers};
use webmsg_wire::Object;

use crate::cmd::SendArgs;
use crate::exit::{disconnect_error, session_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_sent, OutputFormat};

const FLUSH_CHECK_INTERVAL: Duration = Duration::from_millis(25);

pub async fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;
    let config = args.connect.messenger_config()?;
    let transport = args.connect.transport()?;

    let (disconnected, mut disconnects) = mpsc::unbounded_channel();
    let handlers = Handlers::new().on_disconnect(move |disconnect| {
        let _ = disconnected.send(disconnect.clone());
    });
    let client = Client::connect(config, handlers, transport);

    let outcome = tokio::select! {
        delivered = time::timeout(wait_timeout, deliver(&client, payload)) => {
            match delivered {
                Ok(Ok(session_id)) => Ok(session_id),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(CliError::new(
                    TIMEOUT,
                    format!("send timed out after {}", args.wait_timeout),
                )),
            }
        }
        Some(disconnect) = disconnects.recv() => Err(disconnect_error("send failed", &disconnect)),
    };

    client.shutdown().await;
    let session_id = outcome?;
    print_sent(args.channel.as_deref(), session_id.as_deref(), format);
    Ok(SUCCESS)
}

#[derive(Debug, PartialEq)]
enum Payload {
    Root(Value),
    Channel(String, Object),
}

/// Send the payload and wait until nothing is queued or in flight.
async fn deliver(client: &Client, payload: Payload) -> CliResult<Option<String>> {
    match payload {
        Payload::Channel(name, message) => {
            let channel = client
                .channel(&name, Object::new(), ChannelConfig::new())
                .await
                .map_err(|err| session_error("join failed", err))?;
            channel
                .send(message)
                .map_err(|err| session_error("send failed", err))?;
        }
        Payload::Root(message) => client
            .send(message)
            .map_err(|err| session_error("send failed", err))?,
    }

    loop {
        let outstanding = client
            .outstanding()
            .await
            .map_err(|err| session_error("send failed", err))?;
        let session_id = client
            .session_id()
            .await
            .map_err(|err| session_error("send failed", err))?;
        if outstanding == 0 && session_id.is_some() {
            debug!(?session_id, "message delivered");
            return Ok(session_id);
        }
        time::sleep(FLUSH_CHECK_INTERVAL).await;
    }
}

fn resolve_payload(args: &SendArgs) -> CliResult<Payload> {
    let message = if let Some(json) = &args.json {
        serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?
    } else if let Some(data) = &args.data {
        Value::String(data.clone())
    } else {
        return Err(CliError::new(USAGE, "one of --json or --data is required"));
    };

    match (&args.channel, message) {
        (None, message) => Ok(Payload::Root(message)),
        (Some(name), Value::Object(message)) => Ok(Payload::Channel(name.clone(), message)),
        (Some(_), _) => Err(CliError::new(
            USAGE,
            "--channel requires a JSON object payload",
        )),
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
