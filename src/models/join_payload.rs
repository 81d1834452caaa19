use serde::{Deserialize, Serialize};

use super::join_config::JoinConfig;

/// Payload of the `phx_join` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinPayload {
    /// Channel configuration snapshot
    pub config: JoinConfig,
    /// API key authorizing the join; the per-user token travels in the
    /// dedicated `access_token` envelope instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl JoinPayload {
    /// Join payload carrying the given config and API key.
    pub fn new(config: JoinConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            access_token: Some(api_key.into()),
        }
    }
}
