use serde::{Deserialize, Serialize};

use super::change_subscription::ChangeSubscription;

/// Presence block of the join config.
///
/// The broker keys presence state by this value; an empty key delegates key
/// assignment to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceConfig {
    /// Presence key, empty to let the server assign one
    pub key: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self { key: String::new() }
    }
}

/// Read-only snapshot of the subscription registry, built once per join
/// attempt and never mutated after being handed to the codec.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinConfig {
    /// Postgres-change filters in registration order
    pub postgres_changes: Vec<ChangeSubscription>,
    /// Present iff a presence announcement was registered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceConfig>,
}

impl JoinConfig {
    /// Config with the given subscriptions and no presence block.
    pub fn new(postgres_changes: Vec<ChangeSubscription>) -> Self {
        Self {
            postgres_changes,
            presence: None,
        }
    }

    /// Enable the presence block with a server-assigned key.
    pub fn with_presence(mut self) -> Self {
        self.presence = Some(PresenceConfig::default());
        self
    }
}
