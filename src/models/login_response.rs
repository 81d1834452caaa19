use serde::{Deserialize, Serialize};

/// Login response from the auth endpoint.
///
/// Both fields default when absent so that a malformed body parses into a
/// value that fails validation (empty token / zero expiry) instead of
/// producing a separate deserialization error path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Access token for the authenticated user
    #[serde(default)]
    pub access_token: String,
    /// Token lifetime in seconds
    #[serde(default)]
    pub expires_in: u64,
}

impl LoginResponse {
    /// A response is usable iff the token is non-empty and the lifetime is
    /// a positive number of seconds.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && self.expires_in > 0
    }
}
