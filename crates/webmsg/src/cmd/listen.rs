use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};
use webmsg_session::{ChannelConfig, Client, Disconnect, Handlers};
use webmsg_wire::{Inbound, Object};

use crate::cmd::ListenArgs;
use crate::exit::{disconnect_error, session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat};

enum Event {
    Connected(String),
    Received(Value),
    Disconnected(Disconnect),
}

pub async fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.connect.messenger_config()?;
    let transport = args.connect.transport()?;
    let autorestart = config.autorestart;

    let (events, mut inbox) = mpsc::unbounded_channel();
    let client = Client::connect(config, handlers(events.clone()), transport);

    for name in &args.channels {
        let sink = events.clone();
        let channel = ChannelConfig::new().on_receive(move |message| {
            let _ = sink.send(Event::Received(message));
        });
        client
            .channel(name, Object::new(), channel)
            .await
            .map_err(|err| session_error("join failed", err))?;
    }
    drop(events);

    let mut session_id = None;
    let mut printed = 0usize;
    let outcome = loop {
        let event = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    break Err(CliError::new(INTERNAL, format!("signal handler setup failed: {err}")));
                }
                info!("interrupted");
                break Ok(SUCCESS);
            }
            event = inbox.recv() => event,
        };

        match event {
            Some(Event::Connected(id)) => session_id = Some(id),
            Some(Event::Received(message)) => {
                print_message(&Inbound::from(message), session_id.as_deref(), format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break Ok(SUCCESS);
                }
            }
            Some(Event::Disconnected(disconnect)) => {
                if !autorestart {
                    break Err(disconnect_error("session ended", &disconnect));
                }
                warn!(code = disconnect.code, "session ended, reconnect pending");
                session_id = None;
            }
            None => break Ok(SUCCESS),
        }
    };

    client.shutdown().await;
    outcome
}

fn handlers(events: mpsc::UnboundedSender<Event>) -> Handlers {
    let (connected, disconnected, received) = (events.clone(), events.clone(), events);
    Handlers::new()
        .on_connect(move |id| {
            info!(session_id = id, "connected");
            let _ = connected.send(Event::Connected(id.to_string()));
        })
        .on_disconnect(move |disconnect| {
            let _ = disconnected.send(Event::Disconnected(disconnect.clone()));
        })
        .on_receive(move |message| {
            let _ = received.send(Event::Received(message));
        })
}
