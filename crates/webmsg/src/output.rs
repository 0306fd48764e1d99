use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use webmsg_wire::Inbound;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    channel: &'a str,
    session_id: Option<&'a str>,
    message: &'a Value,
    timestamp: String,
}

#[derive(Serialize)]
struct SentOutput<'a> {
    channel: &'a str,
    session_id: Option<&'a str>,
    messages: usize,
    timestamp: String,
}

pub fn print_message(inbound: &Inbound, session_id: Option<&str>, format: OutputFormat) {
    let channel = channel_label(inbound);
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                channel,
                session_id,
                message: &inbound.message,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "SESSION", "MESSAGE"])
                .add_row(vec![
                    channel.to_string(),
                    session_id.unwrap_or("-").to_string(),
                    inbound.message.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "channel={} session={} message={}",
                channel,
                session_id.unwrap_or("-"),
                serde_json::to_string_pretty(&inbound.message)
                    .unwrap_or_else(|_| inbound.message.to_string())
            );
        }
        OutputFormat::Raw => print_raw(&inbound.message),
    }
}

pub fn print_sent(channel: Option<&str>, session_id: Option<&str>, format: OutputFormat) {
    let channel = channel.unwrap_or("root");
    match format {
        OutputFormat::Json => {
            let out = SentOutput {
                channel,
                session_id,
                messages: 1,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "SESSION", "SENT"])
                .add_row(vec![
                    channel.to_string(),
                    session_id.unwrap_or("-").to_string(),
                    "1".to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("sent channel={channel} session={}", session_id.unwrap_or("-"));
        }
        OutputFormat::Raw => {}
    }
}

/// Strings are written as-is; everything else as compact JSON. One per line.
pub fn print_raw(message: &Value) {
    let mut out = std::io::stdout();
    let _ = match message {
        Value::String(text) => writeln!(out, "{text}"),
        other => writeln!(out, "{other}"),
    };
    let _ = out.flush();
}

fn channel_label(inbound: &Inbound) -> &str {
    if inbound.is_root() {
        "root"
    } else {
        inbound.channel.as_deref().unwrap_or("root")
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn root_and_untagged_messages_are_labelled_root() {
        assert_eq!(channel_label(&Inbound::from(json!("hi"))), "root");
        assert_eq!(
            channel_label(&Inbound::from(json!({"CHANNEL": "", "cmd": "welcome"}))),
            "root"
        );
        assert_eq!(
            channel_label(&Inbound::from(json!({"CHANNEL": "chat"}))),
            "chat"
        );
    }
}
