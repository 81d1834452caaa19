use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The four-field message wrapper used by the channel protocol.
///
/// Every frame on the wire — join, auth, presence, heartbeat, and inbound
/// data — is one of these. `ref` is an opaque correlation id; this protocol
/// uses small fixed literal values per message kind rather than a counter,
/// and the literals must be reproduced exactly for interoperability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Message kind (`phx_join`, `access_token`, `presence`, `heartbeat`, ...)
    pub event: String,
    /// Channel topic the message is scoped to
    pub topic: String,
    /// Message body; shape depends on `event`
    pub payload: JsonValue,
    /// Correlation id, a fixed literal per message kind
    #[serde(rename = "ref")]
    pub message_ref: String,
}

impl Envelope {
    /// Create an envelope from its four parts.
    pub fn new(
        event: impl Into<String>,
        topic: impl Into<String>,
        payload: JsonValue,
        message_ref: impl Into<String>,
    ) -> Self {
        Self {
            event: event.into(),
            topic: topic.into(),
            payload,
            message_ref: message_ref.into(),
        }
    }
}
