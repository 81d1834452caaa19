//! Subscription registry.
//!
//! Accumulates postgres-change filters and the presence announcement before
//! a channel join. The registry only grows; there is no removal operation.
//! Each join attempt takes an immutable [`JoinConfig`] snapshot, so
//! registrations made while a join is active take effect on the next join
//! only.

use crate::models::{ChangeSubscription, JoinConfig};

/// Accumulated channel configuration, owned by the client.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    changes: Vec<ChangeSubscription>,
    presence: Option<String>,
}

impl SubscriptionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one change filter. Registration order is preserved on the
    /// wire; duplicates are allowed (the server dedups). An empty `filter`
    /// is recorded as absent.
    pub fn add_changes_listener(
        &mut self,
        table: &str,
        event: &str,
        schema: &str,
        filter: Option<&str>,
    ) {
        self.changes
            .push(ChangeSubscription::new(table, event, schema, filter));
    }

    /// Replace the presence announcement (last write wins) and enable
    /// presence frames on the next join.
    pub fn announce_presence(&mut self, device_name: &str) {
        self.presence = Some(device_name.to_string());
    }

    /// The announced device name, if presence was configured.
    pub fn presence_device(&self) -> Option<&str> {
        self.presence.as_deref()
    }

    /// Number of registered change filters.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether no change filters were registered.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Build the read-only config snapshot for one join attempt.
    pub fn snapshot(&self) -> JoinConfig {
        let config = JoinConfig::new(self.changes.clone());
        if self.presence.is_some() {
            config.with_presence()
        } else {
            config
        }
    }
}
