//! Tokio driver for a [`Messenger`].
//!
//! One task owns the messenger. Callers talk to it over a command channel;
//! request completions and timer ticks come back over an event channel.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use webmsg_transport::{Request, Response, Transport};
use webmsg_wire::Object;

use crate::channel::{ChannelConfig, ChannelHandle};
use crate::config::{Handlers, MessengerConfig};
use crate::error::{Result, SessionError};
use crate::messenger::{Dispatch, Messenger, Ticket};
use crate::scheduler::{Scheduler, TimerKind};
use crate::session::ConnectionState;

enum Command {
    Send(Vec<Value>),
    SendOn(ChannelHandle, Object),
    Stop {
        allow_restart: bool,
    },
    Reconnect,
    Channel {
        name: String,
        join: Object,
        config: ChannelConfig,
        reply: oneshot::Sender<ChannelHandle>,
    },
    Leave(ChannelHandle),
    State(oneshot::Sender<ConnectionState>),
    SessionId(oneshot::Sender<Option<String>>),
    Outstanding(oneshot::Sender<usize>),
}

enum Event {
    Response(Ticket, webmsg_transport::Result<Response>),
    Timer(TimerKind),
}

struct TokioDispatch<T> {
    transport: T,
    events: mpsc::UnboundedSender<Event>,
}

impl<T: Transport> Dispatch for TokioDispatch<T> {
    fn dispatch(&mut self, ticket: Ticket, request: Request) {
        let response = self.transport.issue(request);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = response.await;
            let _ = events.send(Event::Response(ticket, outcome));
        });
    }
}

struct TokioScheduler {
    events: mpsc::UnboundedSender<Event>,
    timers: HashMap<TimerKind, JoinHandle<()>>,
}

impl Scheduler for TokioScheduler {
    fn arm(&mut self, kind: TimerKind, delay: Duration, repeat: bool) {
        self.cancel(kind);
        let events = self.events.clone();
        let task = if repeat && !delay.is_zero() {
            tokio::spawn(async move {
                let mut ticks = time::interval_at(Instant::now() + delay, delay);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticks.tick().await;
                    if events.send(Event::Timer(kind)).is_err() {
                        break;
                    }
                }
            })
        } else {
            tokio::spawn(async move {
                time::sleep(delay).await;
                let _ = events.send(Event::Timer(kind));
            })
        };
        self.timers.insert(kind, task);
    }

    fn cancel(&mut self, kind: TimerKind) {
        if let Some(task) = self.timers.remove(&kind) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for task in self.timers.values() {
            task.abort();
        }
    }
}

/// A messenger running on its own tokio task.
///
/// Dropping the client stops the session.
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Client {
    /// Spawn the messenger task and start connecting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect<T: Transport>(config: MessengerConfig, handlers: Handlers, transport: T) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let dispatch = TokioDispatch {
            transport,
            events: events_tx.clone(),
        };
        let scheduler = TokioScheduler {
            events: events_tx,
            timers: HashMap::new(),
        };
        let messenger = Messenger::new(config, handlers, dispatch, scheduler);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(messenger, commands_rx, events_rx, cancel.clone()));

        Self {
            commands: commands_tx,
            cancel,
            task,
        }
    }

    fn command(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Closed)
    }

    pub fn send(&self, message: Value) -> Result<()> {
        self.command(Command::Send(vec![message]))
    }

    /// Queue several messages so they travel in the same batch when possible.
    pub fn send_batch(&self, messages: impl IntoIterator<Item = Value>) -> Result<()> {
        self.command(Command::Send(messages.into_iter().collect()))
    }

    pub fn stop(&self, allow_restart: bool) -> Result<()> {
        self.command(Command::Stop { allow_restart })
    }

    /// Connect again after a stop or a fatal error.
    pub fn reconnect(&self) -> Result<()> {
        self.command(Command::Reconnect)
    }

    /// Join channel `name`, or return the existing channel of that name.
    pub async fn channel(
        &self,
        name: &str,
        join: Object,
        config: ChannelConfig,
    ) -> Result<ClientChannel> {
        let (reply, handle) = oneshot::channel();
        self.command(Command::Channel {
            name: name.to_string(),
            join,
            config,
            reply,
        })?;
        let handle = handle.await.map_err(|_| SessionError::Closed)?;
        Ok(ClientChannel {
            handle,
            commands: self.commands.clone(),
        })
    }

    pub async fn state(&self) -> Result<ConnectionState> {
        let (reply, state) = oneshot::channel();
        self.command(Command::State(reply))?;
        state.await.map_err(|_| SessionError::Closed)
    }

    pub async fn session_id(&self) -> Result<Option<String>> {
        let (reply, id) = oneshot::channel();
        self.command(Command::SessionId(reply))?;
        id.await.map_err(|_| SessionError::Closed)
    }

    /// Messages queued or in flight, counting an in-flight keep-alive as one.
    pub async fn outstanding(&self) -> Result<usize> {
        let (reply, count) = oneshot::channel();
        self.command(Command::Outstanding(reply))?;
        count.await.map_err(|_| SessionError::Closed)
    }

    /// Stop the session and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        let _ = (&mut self.task).await;
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A channel joined through a [`Client`].
#[derive(Clone)]
pub struct ClientChannel {
    handle: ChannelHandle,
    commands: mpsc::UnboundedSender<Command>,
}

impl ClientChannel {
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn handle(&self) -> &ChannelHandle {
        &self.handle
    }

    /// Send a message tagged with this channel's name.
    pub fn send(&self, message: Object) -> Result<()> {
        self.commands
            .send(Command::SendOn(self.handle.clone(), message))
            .map_err(|_| SessionError::Closed)
    }

    pub fn leave(self) -> Result<()> {
        self.commands
            .send(Command::Leave(self.handle))
            .map_err(|_| SessionError::Closed)
    }
}

async fn run<T: Transport>(
    mut messenger: Messenger<TokioDispatch<T>, TokioScheduler>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
) {
    messenger.connect();
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("client cancelled");
                break;
            }
            Some(event) = events.recv() => match event {
                Event::Response(ticket, outcome) => messenger.on_response(ticket, outcome),
                Event::Timer(kind) => messenger.on_timer(kind),
            },
            command = commands.recv() => match command {
                Some(command) => apply(&mut messenger, command),
                None => {
                    debug!("all client handles dropped");
                    break;
                }
            },
        }
    }
    messenger.stop(false);
}

fn apply<D: Dispatch, S: Scheduler>(messenger: &mut Messenger<D, S>, command: Command) {
    match command {
        Command::Send(messages) => messenger.send_batch(messages),
        Command::SendOn(handle, message) => messenger.send_on(&handle, message),
        Command::Stop { allow_restart } => messenger.stop(allow_restart),
        Command::Reconnect => messenger.connect(),
        Command::Channel {
            name,
            join,
            config,
            reply,
        } => {
            let handle = messenger.channel(&name, join, config);
            let _ = reply.send(handle);
        }
        Command::Leave(handle) => messenger.leave_channel(&handle),
        Command::State(reply) => {
            let _ = reply.send(messenger.state());
        }
        Command::SessionId(reply) => {
            let _ = reply.send(messenger.session_id().map(str::to_string));
        }
        Command::Outstanding(reply) => {
            let in_flight = usize::from(messenger.session().data_pending());
            let _ = reply.send(messenger.queued() + in_flight);
        }
    }
}
