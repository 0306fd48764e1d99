use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::seq::Seq;

/// Body of a data request.
///
/// `data: None` serializes as `null` and marks a keep-alive; an empty
/// batch is never sent.
///
/// ```text
/// {"seq": 101, "data": [{"CHANNEL": "chat", "msg": "hi"}]}
/// {"seq": 102, "data": null}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEnvelope {
    pub seq: Seq,
    pub data: Option<Vec<Value>>,
}

impl DataEnvelope {
    /// A data request carrying a batch of messages.
    pub fn batch(seq: Seq, messages: Vec<Value>) -> Self {
        Self {
            seq,
            data: Some(messages),
        }
    }

    /// A keep-alive data request.
    pub fn keep_alive(seq: Seq) -> Self {
        Self { seq, data: None }
    }

    pub fn is_keep_alive(&self) -> bool {
        self.data.is_none()
    }
}

/// Body of any successful response.
///
/// `seq` and `data` are only meaningful on poll responses. Data responses
/// from the reference server carry `"seq": -1`, so `seq` stays a raw
/// integer here and is validated by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub ses: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
}

/// Encode a data request body.
pub fn encode_data(envelope: &DataEnvelope) -> Result<Bytes> {
    let body = serde_json::to_vec(envelope)?;
    tracing::trace!(
        seq = %envelope.seq,
        keep_alive = envelope.is_keep_alive(),
        size = body.len(),
        "encoded data envelope"
    );
    Ok(Bytes::from(body))
}

/// Decode a response body.
pub fn decode_response(body: &[u8]) -> Result<ResponseEnvelope> {
    Ok(serde_json::from_slice(body)?)
}
