use serde::{Deserialize, Serialize};

/// One postgres-change filter registered before a channel join.
///
/// Collected in registration order; duplicates are allowed (the server is
/// the source of truth for dedup). `filter` is omitted from the serialized
/// object when empty rather than sent as an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeSubscription {
    /// Change kind to listen for (`INSERT`, `UPDATE`, `DELETE`, or `*`)
    pub event: String,
    /// Database schema the table lives in
    pub schema: String,
    /// Table to watch
    pub table: String,
    /// Optional row filter, e.g. `device_id=eq.kitchen-01`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl ChangeSubscription {
    /// Create a subscription; an empty filter is recorded as absent.
    pub fn new(
        table: impl Into<String>,
        event: impl Into<String>,
        schema: impl Into<String>,
        filter: Option<&str>,
    ) -> Self {
        Self {
            event: event.into(),
            schema: schema.into(),
            table: table.into(),
            filter: filter.filter(|f| !f.is_empty()).map(|f| f.to_string()),
        }
    }
}
