use serde::{Deserialize, Serialize};

/// Inner payload of a presence track message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceTrackInfo {
    /// Device name announced to the channel
    pub user: String,
}

/// Payload of the `presence` envelope announcing this client to the channel.
///
/// `online_at` is left unset; the broker stamps presence entries server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceTrack {
    /// Always `presence`
    #[serde(rename = "type")]
    pub kind: String,
    /// Always `track`
    pub event: String,
    /// Announced identity
    pub payload: PresenceTrackInfo,
}

impl PresenceTrack {
    /// Track message announcing the given device name.
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            kind: "presence".to_string(),
            event: "track".to_string(),
            payload: PresenceTrackInfo {
                user: device_name.into(),
            },
        }
    }
}
