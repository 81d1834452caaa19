//! Protocol codec: canonical wire envelopes and inbound frame parsing.
//!
//! Owns the fixed vocabulary of the channel protocol:
//!
//! - `phx_join` — channel membership, sent once per connection attempt
//! - `access_token` — row-level-security context, sent after join and
//!   alongside every heartbeat while authenticated
//! - `presence` — device announcement, sent after auth when configured
//! - `heartbeat` — keepalive on the `phoenix` control topic
//!
//! Every outbound envelope is built as a fresh immutable value from current
//! state; nothing here mutates a shared template. The `ref` correlation ids
//! are fixed literals per message kind, not a counter, and are part of the
//! protocol contract.

use serde_json::{json, Value as JsonValue};

use crate::error::{RealtimeLinkError, Result};
use crate::models::{Envelope, JoinConfig, JoinPayload, PresenceTrack};

/// The single wildcard channel every subscription is scoped to.
pub const CHANNEL_TOPIC: &str = "realtime:*";

/// Control topic for heartbeats.
pub const HEARTBEAT_TOPIC: &str = "phoenix";

/// Fixed correlation id of heartbeat envelopes.
pub const HEARTBEAT_REF: &str = "0";

/// Fixed correlation id of the join envelope.
pub const JOIN_REF: &str = "1";

/// Fixed correlation id of presence envelopes.
pub const PRESENCE_REF: &str = "2";

/// Fixed correlation id of access-token envelopes.
pub const ACCESS_TOKEN_REF: &str = "3";

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Row-change notification; carries `payload.data` verbatim.
    RowChange(JsonValue),
    /// Any other protocol frame (join replies, presence diffs, heartbeat
    /// acks). Kept parsed for diagnostics; the session ignores these.
    Other(JsonValue),
}

/// Build the `phx_join` envelope for a connection attempt.
pub fn join_envelope(config: JoinConfig, api_key: &str) -> Result<Envelope> {
    let payload = serde_json::to_value(JoinPayload::new(config, api_key))
        .map_err(|e| RealtimeLinkError::MalformedMessage(format!("join payload: {}", e)))?;
    Ok(Envelope::new("phx_join", CHANNEL_TOPIC, payload, JOIN_REF))
}

/// Build the `access_token` envelope carrying the current user token.
pub fn access_token_envelope(token: &str) -> Envelope {
    Envelope::new(
        "access_token",
        CHANNEL_TOPIC,
        json!({ "access_token": token }),
        ACCESS_TOKEN_REF,
    )
}

/// Build the `presence` track envelope for the announced device name.
pub fn presence_envelope(device_name: &str) -> Result<Envelope> {
    let payload = serde_json::to_value(PresenceTrack::new(device_name))
        .map_err(|e| RealtimeLinkError::MalformedMessage(format!("presence payload: {}", e)))?;
    Ok(Envelope::new(
        "presence",
        CHANNEL_TOPIC,
        payload,
        PRESENCE_REF,
    ))
}

/// Build the periodic heartbeat envelope.
pub fn heartbeat_envelope() -> Envelope {
    Envelope::new("heartbeat", HEARTBEAT_TOPIC, json!({}), HEARTBEAT_REF)
}

/// Serialize an envelope to its wire text.
pub fn encode(envelope: &Envelope) -> Result<String> {
    serde_json::to_string(envelope)
        .map_err(|e| RealtimeLinkError::MalformedMessage(format!("encode envelope: {}", e)))
}

/// Parse inbound wire text into a frame.
///
/// A frame is a row-change event iff `payload.data.table` is present,
/// non-null, and not the literal string `"null"` (brokers emit that literal
/// for non-row frames on the data path). Everything else is [`InboundFrame::Other`].
/// Unparseable text is an error the caller is expected to swallow.
pub fn decode_frame(text: &str) -> Result<InboundFrame> {
    let value: JsonValue = serde_json::from_str(text)
        .map_err(|e| RealtimeLinkError::MalformedMessage(e.to_string()))?;

    if let Some(data) = value.pointer("/payload/data") {
        if has_row_table(data) {
            return Ok(InboundFrame::RowChange(data.clone()));
        }
    }

    Ok(InboundFrame::Other(value))
}

fn has_row_table(data: &JsonValue) -> bool {
    match data.get("table") {
        Some(JsonValue::Null) | None => false,
        Some(JsonValue::String(s)) => s != "null",
        Some(_) => true,
    }
}
