use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use webmsg_session::{
    ChannelConfig, ConnectionState, Handlers, ManualScheduler, Messenger, MessengerConfig, Ticket,
    TimerKind,
};
use webmsg_transport::{Method, Request, Response};
use webmsg_wire::Object;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Connect(String),
    Disconnect(String, i32),
    Receive(Value),
}

type Log = Arc<Mutex<Vec<Seen>>>;

struct Harness {
    messenger: Messenger<Vec<(Ticket, Request)>, ManualScheduler>,
    log: Log,
}

impl Harness {
    fn new(config: MessengerConfig) -> Self {
        let log = Log::default();
        let (on_connect, on_disconnect, on_receive) = (log.clone(), log.clone(), log.clone());
        let handlers = Handlers::new()
            .on_connect(move |id| on_connect.lock().unwrap().push(Seen::Connect(id.to_string())))
            .on_disconnect(move |d| {
                on_disconnect
                    .lock()
                    .unwrap()
                    .push(Seen::Disconnect("root".to_string(), d.code))
            })
            .on_receive(move |msg| on_receive.lock().unwrap().push(Seen::Receive(msg)));
        let messenger = Messenger::new(config, handlers, Vec::new(), ManualScheduler::new());
        Self { messenger, log }
    }

    fn requests(&self) -> &[(Ticket, Request)] {
        self.messenger.dispatcher()
    }

    fn last(&self) -> (Ticket, Request) {
        self.requests()
            .last()
            .cloned()
            .expect("a request should have been issued")
    }

    fn count(&self, method: Method) -> usize {
        self.requests()
            .iter()
            .filter(|(ticket, _)| ticket.method == method)
            .count()
    }

    fn last_of(&self, method: Method) -> (Ticket, Request) {
        self.requests()
            .iter()
            .rev()
            .find(|(ticket, _)| ticket.method == method)
            .cloned()
            .expect("a request of that method should have been issued")
    }

    fn reply(&mut self, ticket: Ticket, body: Value) {
        self.messenger
            .on_response(ticket, Ok(Response::new(200, body.to_string())));
    }

    /// Connect and complete the bootstrap with session `id`.
    fn established(config: MessengerConfig, id: &str) -> Self {
        let mut h = Self::new(config);
        h.messenger.connect();
        let (ticket, _) = h.last();
        h.reply(ticket, json!({"ses": id}));
        h
    }

    fn seen(&self) -> Vec<Seen> {
        self.log.lock().unwrap().clone()
    }
}

fn data_body(request: &Request) -> Value {
    let body = request.body.as_ref().expect("data request should have a body");
    serde_json::from_slice(body).expect("body should be json")
}

#[test]
fn end_to_end_connect_poll_receive() {
    let mut h = Harness::new(MessengerConfig::new("http://h/_webmsg/"));
    h.messenger.connect();
    let (ticket, req) = h.last();
    assert_eq!(req.url, "http://h/_webmsg/new");
    h.reply(ticket, json!({"ses": "S1"}));

    assert_eq!(h.seen(), vec![Seen::Connect("S1".to_string())]);
    assert_eq!(h.messenger.state(), ConnectionState::Connected);
    let (poll, req) = h.last();
    assert_eq!(poll.method, Method::Poll);
    assert_eq!(req.url, "http://h/_webmsg/S1");
    assert!(req.body.is_none());

    h.reply(poll, json!({"ses": "S1", "seq": 7, "data": ["hello"]}));
    assert_eq!(
        h.seen(),
        vec![
            Seen::Connect("S1".to_string()),
            Seen::Receive(json!("hello"))
        ]
    );
    assert_eq!(h.messenger.session().rx_seq().map(|s| s.get()), Some(8));
    assert_eq!(h.count(Method::Poll), 2);
    assert!(h.messenger.session().poll_pending());
}

#[test]
fn bad_session_on_data_response_is_fatal() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    h.messenger.send(json!("a"));
    let (data, _) = h.last_of(Method::SendData);
    h.reply(data, json!({"ses": "S2", "seq": -1}));

    assert!(h.messenger.is_stopped());
    assert_eq!(
        h.seen().last(),
        Some(&Seen::Disconnect("root".to_string(), -1))
    );
    assert_eq!(h.messenger.state(), ConnectionState::Error);
}

#[test]
fn poll_sequence_mismatch_stops_session() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    let (poll, _) = h.last_of(Method::Poll);
    h.reply(poll, json!({"ses": "S1", "seq": 7, "data": []}));
    let (poll, _) = h.last_of(Method::Poll);
    h.reply(poll, json!({"ses": "S1", "seq": 9, "data": ["dropped"]}));

    assert!(h.messenger.is_stopped());
    assert_eq!(
        h.seen(),
        vec![
            Seen::Connect("S1".to_string()),
            Seen::Disconnect("root".to_string(), -2)
        ]
    );
    let issued = h.requests().len();
    h.messenger.poll();
    h.messenger.send(json!("after"));
    assert_eq!(h.requests().len(), issued);
}

#[test]
fn single_standing_poll() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    assert_eq!(h.count(Method::Poll), 1);
    h.messenger.poll();
    h.messenger.poll();
    assert_eq!(h.count(Method::Poll), 1);
}

#[test]
fn sends_during_flight_are_batched() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    h.messenger.send(json!("first"));
    let (inflight, req) = h.last_of(Method::SendData);
    assert_eq!(data_body(&req), json!({"seq": 101, "data": ["first"]}));

    h.messenger.send(json!("A"));
    h.messenger.send(json!("B"));
    assert_eq!(h.count(Method::SendData), 2);
    assert_eq!(h.messenger.queued(), 2);

    h.reply(inflight, json!({"ses": "S1", "seq": -1}));
    let (_, req) = h.last_of(Method::SendData);
    assert_eq!(data_body(&req), json!({"seq": 102, "data": ["A", "B"]}));
    assert_eq!(h.messenger.queued(), 0);
}

#[test]
fn send_batch_keeps_order() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    h.messenger.send_batch([json!(1), json!(2), json!(3)]);
    let (_, req) = h.last_of(Method::SendData);
    assert_eq!(data_body(&req)["data"], json!([1, 2, 3]));
}

#[test]
fn channel_twice_returns_same_handle() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    let first = h
        .messenger
        .channel("x", Object::new(), ChannelConfig::new());
    let (data, _) = h.last_of(Method::SendData);
    let second = h
        .messenger
        .channel("x", Object::new(), ChannelConfig::new());
    assert_eq!(first, second);

    h.reply(data, json!({"ses": "S1", "seq": -1}));
    assert_eq!(h.count(Method::SendData), 2);
    let (_, req) = h.last_of(Method::SendData);
    assert_eq!(
        data_body(&req)["data"],
        json!([{"CHANNEL": "", "cmd": "join_channel", "channel": "x"}])
    );
}

#[test]
fn channel_disconnect_handlers_run_before_root() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    for name in ["a", "b"] {
        let log = h.log.clone();
        h.messenger.channel(
            name,
            Object::new(),
            ChannelConfig::new()
                .on_disconnect(move |d| log.lock().unwrap().push(Seen::Disconnect(name.to_string(), d.code))),
        );
    }
    let (poll, _) = h.last_of(Method::Poll);
    h.messenger
        .on_response(poll, Ok(Response::new(502, "bad gateway")));

    assert_eq!(
        h.seen()[1..],
        [
            Seen::Disconnect("a".to_string(), 502),
            Seen::Disconnect("b".to_string(), 502),
            Seen::Disconnect("root".to_string(), 502),
        ]
    );
}

#[test]
fn channel_messages_route_by_tag() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    let chat_log = Log::default();
    let sink = chat_log.clone();
    let chat = h.messenger.channel(
        "chat",
        Object::new(),
        ChannelConfig::new().on_receive(move |msg| sink.lock().unwrap().push(Seen::Receive(msg))),
    );

    let (poll, _) = h.last_of(Method::Poll);
    h.reply(
        poll,
        json!({"ses": "S1", "seq": 0, "data": [
            {"CHANNEL": "chat", "text": "hi"},
            {"CHANNEL": "", "cmd": "welcome", "session_id": "S1"},
            {"CHANNEL": "elsewhere"}
        ]}),
    );
    assert_eq!(
        *chat_log.lock().unwrap(),
        vec![Seen::Receive(json!({"CHANNEL": "chat", "text": "hi"}))]
    );
    assert_eq!(
        h.seen()[1..],
        [
            Seen::Receive(json!({"CHANNEL": "", "cmd": "welcome", "session_id": "S1"})),
            Seen::Receive(json!({"CHANNEL": "elsewhere"})),
        ]
    );

    let mut message = Object::new();
    message.insert("text".to_string(), json!("yo"));
    h.messenger.send_on(&chat, message);
    assert_eq!(h.messenger.queued(), 1);
}

#[test]
fn leave_channel_reroutes_to_root() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    let chat = h
        .messenger
        .channel("chat", Object::new(), ChannelConfig::new());
    h.messenger.leave_channel(&chat);
    h.messenger.leave_channel(&chat);
    assert_eq!(h.messenger.channels().count(), 0);

    let (data, _) = h.last_of(Method::SendData);
    h.reply(data, json!({"ses": "S1", "seq": -1}));
    let (_, req) = h.last_of(Method::SendData);
    assert_eq!(
        data_body(&req)["data"],
        json!([{"CHANNEL": "", "cmd": "leave_channel", "channel": "chat"}])
    );

    let (poll, _) = h.last_of(Method::Poll);
    h.reply(poll, json!({"ses": "S1", "seq": 3, "data": [{"CHANNEL": "chat"}]}));
    assert_eq!(
        h.seen().last(),
        Some(&Seen::Receive(json!({"CHANNEL": "chat"})))
    );
}

#[test]
fn keep_alive_sends_null_payload_each_period() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    h.messenger.advance(Duration::from_secs(59));
    assert_eq!(h.count(Method::SendData), 1);

    h.messenger.advance(Duration::from_secs(1));
    let (ticket, req) = h.last_of(Method::SendData);
    assert_eq!(data_body(&req), json!({"seq": 101, "data": null}));
    assert_eq!(req.url, "/_webmsg/S1");

    h.reply(ticket, json!({"ses": "S1", "seq": -1}));
    h.messenger.advance(Duration::from_secs(60));
    let (_, req) = h.last_of(Method::SendData);
    assert_eq!(data_body(&req), json!({"seq": 102, "data": null}));
}

#[test]
fn autorestart_schedules_one_reconnect() {
    let config = MessengerConfig::default()
        .with_autorestart(true)
        .with_restart_delay(Duration::from_secs(5));
    let mut h = Harness::established(config, "S1");
    h.messenger.send(json!("a"));
    let (poll, _) = h.last_of(Method::Poll);
    let (data, _) = h.last_of(Method::SendData);

    h.messenger.on_response(poll, Ok(Response::new(500, "")));
    assert_eq!(h.messenger.state(), ConnectionState::ReconnectPending);
    assert!(h.messenger.restart_pending());
    h.messenger.stop(true);
    assert_eq!(h.messenger.state(), ConnectionState::ReconnectPending);
    assert_eq!(
        h.messenger.scheduler().deadline(TimerKind::Restart),
        Some(Duration::from_secs(5))
    );

    // Late completion of the old data request is dropped.
    h.reply(data, json!({"ses": "S1", "seq": -1}));
    let issued = h.requests().len();

    h.messenger.advance(Duration::from_secs(4));
    assert_eq!(h.requests().len(), issued);
    h.messenger.advance(Duration::from_secs(1));
    assert_eq!(h.requests().len(), issued + 1);
    assert!(!h.messenger.restart_pending());
    assert_eq!(h.messenger.state(), ConnectionState::Connecting);

    let (ticket, req) = h.last();
    assert_eq!(ticket.epoch, 2);
    assert_eq!(req.url, "/_webmsg/new");
    assert_eq!(data_body(&req), json!({"seq": 100, "data": null}));
}

#[test]
fn late_response_from_previous_session_is_ignored() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    let (old_poll, _) = h.last_of(Method::Poll);
    h.messenger.stop(false);
    h.messenger.connect();
    assert_eq!(h.messenger.session().epoch(), 2);

    h.reply(old_poll, json!({"ses": "S1", "seq": 1, "data": ["stale"]}));
    assert!(h.messenger.session_id().is_none());
    assert_eq!(h.seen(), vec![Seen::Connect("S1".to_string())]);

    let (bootstrap, _) = h.last();
    h.reply(bootstrap, json!({"ses": "S2"}));
    assert_eq!(h.messenger.session_id(), Some("S2"));
    assert_eq!(
        h.seen(),
        vec![
            Seen::Connect("S1".to_string()),
            Seen::Connect("S2".to_string())
        ]
    );
}

#[test]
fn reconnect_rejoins_channels_and_keeps_queue() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    let mut join = Object::new();
    join.insert("temporary".to_string(), json!(true));
    h.messenger.channel("chat", join, ChannelConfig::new());
    h.messenger.send(json!("queued"));
    assert_eq!(h.messenger.queued(), 1);

    h.messenger.stop(false);
    h.messenger
        .channel("late", Object::new(), ChannelConfig::new());
    assert_eq!(h.messenger.queued(), 1);

    h.messenger.connect();
    assert_eq!(h.messenger.queued(), 3);
    let (bootstrap, _) = h.last();
    h.reply(bootstrap, json!({"ses": "S2"}));

    let (_, req) = h.last_of(Method::SendData);
    assert_eq!(
        data_body(&req),
        json!({"seq": 101, "data": [
            {"CHANNEL": "", "cmd": "join_channel", "channel": "chat", "temporary": true},
            {"CHANNEL": "", "cmd": "join_channel", "channel": "late"},
            "queued"
        ]})
    );
}

#[test]
fn failed_bootstrap_does_not_double_join_on_reconnect() {
    let mut h = Harness::new(MessengerConfig::default());
    h.messenger.connect();
    h.messenger
        .channel("chat", Object::new(), ChannelConfig::new());
    assert_eq!(h.messenger.queued(), 1);

    let (bootstrap, _) = h.last();
    h.messenger
        .on_response(bootstrap, Ok(Response::new(503, "")));
    assert!(h.messenger.is_stopped());

    h.messenger.connect();
    assert_eq!(h.messenger.queued(), 1);
    let (bootstrap, _) = h.last();
    h.reply(bootstrap, json!({"ses": "S2"}));

    let (_, req) = h.last_of(Method::SendData);
    assert_eq!(
        data_body(&req)["data"],
        json!([{"CHANNEL": "", "cmd": "join_channel", "channel": "chat"}])
    );
}

#[test]
fn leave_then_rejoin_while_stopped_ends_joined() {
    let mut h = Harness::established(MessengerConfig::default(), "S1");
    let chat = h
        .messenger
        .channel("chat", Object::new(), ChannelConfig::new());
    h.messenger.stop(false);

    h.messenger.leave_channel(&chat);
    assert_eq!(h.messenger.queued(), 0);
    h.messenger
        .channel("chat", Object::new(), ChannelConfig::new());

    h.messenger.connect();
    let (bootstrap, _) = h.last();
    h.reply(bootstrap, json!({"ses": "S2"}));

    let (_, req) = h.last_of(Method::SendData);
    let body = data_body(&req);
    let batch = body["data"].as_array().expect("data should be a batch");
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.last().map(|m| &m["cmd"]), Some(&json!("join_channel")));
    assert_eq!(batch[0]["channel"], "chat");
}

#[test]
fn transport_error_status_is_reported() {
    let mut h = Harness::new(MessengerConfig::default());
    h.messenger.connect();
    let (ticket, _) = h.last();
    h.messenger
        .on_response(ticket, Ok(Response::new(403, "forbidden")));
    assert_eq!(
        h.seen(),
        vec![Seen::Disconnect("root".to_string(), 403)]
    );
    assert!(!h.messenger.scheduler().is_armed(TimerKind::KeepAlive));
    assert!(!h.messenger.scheduler().is_armed(TimerKind::Restart));
}

#[test]
fn credentials_ride_on_every_request() {
    let config = MessengerConfig::default().with_credentials("alice", Some("pw".to_string()));
    let h = Harness::established(config, "S1");
    assert!(h.requests().iter().all(|(_, req)| req
        .credentials
        .as_ref()
        .is_some_and(|c| c.user == "alice")));
}
