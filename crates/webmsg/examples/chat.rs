//! Chat example — joins a channel, says hello and prints what comes back.
//!
//! Run against a messenger endpoint with:
//!   cargo run --example chat --features http,async -- http://localhost:8000/_webmsg

use std::time::Duration;

use serde_json::json;
use webmsg::session::{ChannelConfig, Client, Handlers, MessengerConfig, SessionError};
use webmsg::transport::HttpTransport;
use webmsg::wire::Object;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000/_webmsg".to_string());

    let handlers = Handlers::new()
        .on_connect(|id| eprintln!("[chat] session {id}"))
        .on_disconnect(|d| eprintln!("[chat] disconnected: {} ({})", d.message, d.code))
        .on_receive(|message| eprintln!("[chat] root: {message}"));
    let config = MessengerConfig::new(url).with_autorestart(true);
    let client = Client::connect(config, handlers, HttpTransport::new());

    let chat = client
        .channel(
            "chat",
            Object::new(),
            ChannelConfig::new().on_receive(|message| eprintln!("[chat] chat: {message}")),
        )
        .await?;

    let mut hello = Object::new();
    hello.insert("text".to_string(), json!("hello from webmsg"));
    chat.send(hello)?;

    tokio::signal::ctrl_c().await?;
    chat.leave()?;
    let flushed = tokio::time::timeout(Duration::from_secs(5), async {
        while client.outstanding().await? > 0 {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        Ok::<_, SessionError>(())
    })
    .await;
    if !matches!(flushed, Ok(Ok(()))) {
        eprintln!("[chat] leave not confirmed before shutdown");
    }
    client.shutdown().await;
    Ok(())
}
