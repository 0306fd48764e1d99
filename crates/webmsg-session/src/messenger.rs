use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, trace, warn};
use webmsg_transport::{Method, Request, Response};
use webmsg_wire::{decode_response, encode_data, session_url, tag, DataEnvelope, Inbound, Object};

use crate::channel::{ChannelConfig, ChannelHandle, ChannelMux};
use crate::config::{Disconnect, Handlers, MessengerConfig};
use crate::control::ControlMessage;
use crate::error::SessionError;
use crate::queue::OutboundQueue;
use crate::scheduler::{ManualScheduler, Scheduler, TimerKind};
use crate::session::{Adoption, ConnectionState, Session};

/// Identifies an in-flight request when its response comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub method: Method,
    /// Epoch of the session that issued the request.
    pub epoch: u64,
}

/// Sends requests on behalf of a messenger.
///
/// `dispatch` must return without waiting for the response. Whatever the
/// request produces is later handed to [`Messenger::on_response`] together
/// with the ticket.
pub trait Dispatch {
    fn dispatch(&mut self, ticket: Ticket, request: Request);
}

/// Collects requests instead of issuing them, for driving a messenger by hand.
impl Dispatch for Vec<(Ticket, Request)> {
    fn dispatch(&mut self, ticket: Ticket, request: Request) {
        self.push((ticket, request));
    }
}

/// Client side of the long-poll session protocol.
pub struct Messenger<D, S> {
    config: MessengerConfig,
    handlers: Handlers,
    dispatch: D,
    scheduler: S,
    session: Session,
    state: ConnectionState,
    outbound: OutboundQueue,
    channels: ChannelMux,
    restart_pending: bool,
    epoch: u64,
}

impl<D: Dispatch, S: Scheduler> Messenger<D, S> {
    /// Create a disconnected messenger. Nothing is sent until [`connect`](Self::connect).
    pub fn new(config: MessengerConfig, handlers: Handlers, dispatch: D, scheduler: S) -> Self {
        Self {
            config,
            handlers,
            dispatch,
            scheduler,
            session: Session::idle(),
            state: ConnectionState::Disconnected,
            outbound: OutboundQueue::new(),
            channels: ChannelMux::default(),
            restart_pending: false,
            epoch: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.id()
    }

    pub fn is_stopped(&self) -> bool {
        self.session.is_stopped()
    }

    pub fn restart_pending(&self) -> bool {
        self.restart_pending
    }

    /// Number of messages waiting for a data request.
    pub fn queued(&self) -> usize {
        self.outbound.len()
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelHandle> {
        self.channels.handles()
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatch
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Start a new session.
    ///
    /// Sends a keep-alive to obtain a session id and arms the keep-alive
    /// timer. Ignored while connecting or connected.
    pub fn connect(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!(state = ?self.state, "connect ignored");
            return;
        }
        if self.restart_pending {
            self.restart_pending = false;
            self.scheduler.cancel(TimerKind::Restart);
        }

        let reconnect = self.epoch > 0;
        self.epoch += 1;
        self.session = Session::new(self.epoch);
        self.state = ConnectionState::Connecting;
        info!(url = %self.config.url, epoch = self.epoch, "connecting");

        self.issue_keep_alive();
        if reconnect {
            let stale = self
                .outbound
                .retain(|message| !ControlMessage::is_membership(message));
            if stale > 0 {
                debug!(dropped = stale, "dropped stale join/leave requests");
            }
            let joins = self.channels.join_messages();
            if !joins.is_empty() {
                debug!(channels = joins.len(), "rejoining channels");
                self.outbound.prepend(joins);
            }
        }
        if !self.session.is_stopped() {
            self.scheduler
                .arm(TimerKind::KeepAlive, self.config.keep_alive_period, true);
        }
    }

    /// Tear the session down.
    ///
    /// No request is issued afterwards and late responses are ignored.
    /// With `allow_restart` and `autorestart` configured, a reconnect is
    /// scheduled; without `allow_restart` any pending reconnect is dropped.
    pub fn stop(&mut self, allow_restart: bool) {
        if !self.session.is_stopped() {
            self.session.stop();
            self.scheduler.cancel(TimerKind::KeepAlive);
            info!(session_id = ?self.session.id(), "session stopped");
        }
        if allow_restart {
            self.schedule_restart();
        } else if self.restart_pending {
            self.restart_pending = false;
            self.scheduler.cancel(TimerKind::Restart);
        }
        self.state = if self.restart_pending {
            ConnectionState::ReconnectPending
        } else {
            ConnectionState::Disconnected
        };
    }

    /// Queue one message and flush the queue if no data request is in flight.
    pub fn send(&mut self, message: Value) {
        self.outbound.push(message);
        self.flush();
    }

    /// Queue several messages, in order, and flush.
    pub fn send_batch(&mut self, messages: impl IntoIterator<Item = Value>) {
        self.outbound.extend(messages);
        self.flush();
    }

    /// Get the handle for channel `name`, joining it if needed.
    ///
    /// A second call for the same name returns the first handle; its
    /// `join` fields and `config` are discarded.
    pub fn channel(&mut self, name: &str, join: Object, config: ChannelConfig) -> ChannelHandle {
        if let Some(handle) = self.channels.find(name) {
            debug!(channel = name, "channel already registered");
            return handle.clone();
        }

        let handle = self.channels.register(name, join.clone(), config);
        if self.session.is_stopped() && self.epoch > 0 {
            // The next connect rejoins every registered channel.
            debug!(channel = name, "join deferred until reconnect");
        } else {
            self.send(ControlMessage::join_channel(name, join).into_message());
        }
        handle
    }

    /// Send a message on a channel, tagged with the channel's name.
    pub fn send_on(&mut self, channel: &ChannelHandle, message: Object) {
        self.send(tag(message, channel.name()));
    }

    /// Leave a channel and forget its handlers.
    pub fn leave_channel(&mut self, channel: &ChannelHandle) {
        if !self.channels.remove(channel) {
            debug!(channel = channel.name(), "leave ignored: not registered");
            return;
        }
        if self.session.is_stopped() && self.epoch > 0 {
            // The next connect rejoins only what is still registered.
            debug!(channel = channel.name(), "leave applied locally");
            return;
        }
        self.send(ControlMessage::leave_channel(channel.name()).into_message());
    }

    /// Make sure the standing poll is outstanding.
    ///
    /// No-op while a poll is in flight, before a session id is known, or
    /// once stopped.
    pub fn poll(&mut self) {
        if self.session.is_stopped() || self.session.poll_pending() {
            return;
        }
        let Some(id) = self.session.id() else {
            return;
        };

        let url = session_url(&self.config.url, Some(id));
        debug!(%url, "issuing poll");
        self.session.set_pending(Method::Poll, true);
        let ticket = self.ticket(Method::Poll);
        self.dispatch
            .dispatch(ticket, Request::poll(url, self.config.credentials()));
    }

    /// Feed back the outcome of a dispatched request.
    pub fn on_response(&mut self, ticket: Ticket, outcome: webmsg_transport::Result<Response>) {
        if ticket.epoch != self.session.epoch() || self.session.is_stopped() {
            debug!(?ticket, "ignoring response for a stopped session");
            return;
        }
        self.session.set_pending(ticket.method, false);

        let response = match outcome {
            Ok(response) => response,
            Err(err) => return self.fail(SessionError::Request(err)),
        };
        if !response.is_success() {
            return self.fail(SessionError::Status {
                status: response.status,
            });
        }
        let envelope = match decode_response(&response.body) {
            Ok(envelope) => envelope,
            Err(err) => return self.fail(SessionError::MalformedResponse(err)),
        };

        let had_session = self.session.id().is_some();
        match self.session.adopt(&envelope.ses) {
            Adoption::Adopted => {
                self.state = ConnectionState::Connected;
                info!(session_id = %envelope.ses, "session established");
                if let Some(handler) = &mut self.handlers.on_connect {
                    handler(&envelope.ses);
                }
            }
            Adoption::Matched => {}
            Adoption::Mismatch { expected } => {
                return self.fail(SessionError::SessionMismatch {
                    expected,
                    actual: envelope.ses,
                });
            }
        }

        if ticket.method == Method::Poll {
            if let Err(err) = self.session.accept_rx_seq(envelope.seq) {
                return self.fail(err);
            }
            for message in envelope.data.unwrap_or_default() {
                self.deliver(Inbound::from(message));
            }
        }

        if ticket.method == Method::Poll || !had_session {
            self.poll();
        }
        if ticket.method == Method::SendData {
            self.flush();
        }
    }

    /// Handle a fired timer.
    pub fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::KeepAlive => {
                if !self.session.is_stopped() {
                    self.issue_keep_alive();
                }
            }
            TimerKind::Restart => {
                if !self.restart_pending {
                    return;
                }
                info!("reconnecting");
                self.connect();
            }
        }
    }

    fn ticket(&self, method: Method) -> Ticket {
        Ticket {
            method,
            epoch: self.session.epoch(),
        }
    }

    fn flush(&mut self) {
        if self.session.is_stopped() || self.session.data_pending() || self.outbound.is_empty() {
            return;
        }
        let batch = self.outbound.take();
        self.issue_data(Some(batch));
    }

    fn issue_keep_alive(&mut self) {
        if self.session.is_stopped() {
            return;
        }
        if self.session.data_pending() {
            trace!("keep-alive skipped: data request in flight");
            return;
        }
        self.issue_data(None);
    }

    fn issue_data(&mut self, payload: Option<Vec<Value>>) {
        let seq = self.session.next_tx_seq();
        let envelope = match payload {
            Some(messages) => DataEnvelope::batch(seq, messages),
            None => DataEnvelope::keep_alive(seq),
        };
        let body = match encode_data(&envelope) {
            Ok(body) => body,
            Err(err) => return self.fail(SessionError::Encode(err)),
        };

        let url = session_url(&self.config.url, self.session.id());
        debug!(
            %url,
            %seq,
            messages = envelope.data.as_ref().map_or(0, Vec::len),
            keep_alive = envelope.is_keep_alive(),
            "issuing data request"
        );
        self.session.set_pending(Method::SendData, true);
        let ticket = self.ticket(Method::SendData);
        self.dispatch.dispatch(
            ticket,
            Request::send_data(url, body, self.config.credentials()),
        );
    }

    fn deliver(&mut self, inbound: Inbound) {
        let Some(inbound) = self.channels.route(inbound) else {
            return;
        };
        if let Some(cmd) = ControlMessage::parse(&inbound.message).filter(|c| c.is_welcome()) {
            debug!(session_id = ?cmd.session_id, "welcomed by server");
        }
        match &mut self.handlers.on_receive {
            Some(handler) => handler(inbound.message),
            None => debug!(message = %inbound.message, "unhandled message"),
        }
    }

    fn schedule_restart(&mut self) {
        if !self.config.autorestart || self.restart_pending {
            return;
        }
        info!(delay = ?self.config.restart_delay, "reconnect scheduled");
        self.restart_pending = true;
        self.scheduler
            .arm(TimerKind::Restart, self.config.restart_delay, false);
    }

    fn fail(&mut self, error: SessionError) {
        let disconnect = Disconnect {
            message: error.to_string(),
            code: error.code(),
        };
        warn!(code = disconnect.code, %error, "session failed");

        self.stop(true);
        if self.state != ConnectionState::ReconnectPending {
            self.state = ConnectionState::Error;
        }

        self.channels.notify_disconnect(&disconnect);
        match &mut self.handlers.on_disconnect {
            Some(handler) => handler(&disconnect),
            None => debug!(code = disconnect.code, "disconnected"),
        }
    }
}

impl<D: Dispatch> Messenger<D, ManualScheduler> {
    /// Advance virtual time, handling every timer that fires on the way.
    pub fn advance(&mut self, by: Duration) {
        let until = self.scheduler.now() + by;
        while let Some(kind) = self.scheduler.pop_due(until) {
            self.on_timer(kind);
        }
        self.scheduler.settle(until);
    }
}
