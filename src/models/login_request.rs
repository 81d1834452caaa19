use serde::{Deserialize, Serialize};

/// How the user identifies to the auth endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    /// Identifier is an email address
    Email,
    /// Identifier is a phone number
    Phone,
}

/// Login request body for the password grant.
///
/// Exactly one of `email` / `phone` is serialized, chosen by the
/// [`LoginMethod`] the request was built with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email identifier (email method only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone identifier (phone method only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Account password
    pub password: String,
}

impl LoginRequest {
    /// Build a request body for the given method.
    pub fn new(method: LoginMethod, identifier: &str, secret: &str) -> Self {
        let (email, phone) = match method {
            LoginMethod::Email => (Some(identifier.to_string()), None),
            LoginMethod::Phone => (None, Some(identifier.to_string())),
        };
        Self {
            email,
            phone,
            password: secret.to_string(),
        }
    }
}
