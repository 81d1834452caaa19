//! Synchronous HTTP collaborator, used only for login.

use crate::error::{RealtimeLinkError, Result};

/// Single-operation HTTP client: one synchronous JSON POST.
///
/// An `Err` means no HTTP response was obtained at all (DNS failure, refused
/// connection, timeout) — the credential manager treats that as transient
/// and retries. Any `(status, body)` pair, including error statuses, is a
/// definitive response.
pub trait HttpPost {
    /// POST `body` as JSON to `url` with the given extra headers.
    fn post(&self, url: &str, headers: &[(&str, &str)], body: &str) -> Result<(u16, String)>;
}

/// Production HTTP client on `reqwest::blocking`.
pub struct ReqwestHttp {
    client: reqwest::blocking::Client,
}

impl ReqwestHttp {
    /// Build a client with the given request timeout.
    pub fn new(timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RealtimeLinkError::ConfigurationError(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpPost for ReqwestHttp {
    fn post(&self, url: &str, headers: &[(&str, &str)], body: &str) -> Result<(u16, String)> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_string());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .map_err(|e| RealtimeLinkError::TransportError(format!("login POST failed: {}", e)))?;

        let status = response.status().as_u16();
        let text = response.text().unwrap_or_default();
        Ok((status, text))
    }
}
