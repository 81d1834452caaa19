//! Credential manager: login, access-token acquisition, expiry tracking.
//!
//! Owns the login credentials and the derived access token. The session
//! polls [`CredentialManager::refresh_due`] each tick and, when it fires,
//! tears the socket down before asking for a synchronous re-login — an auth
//! HTTP call never interleaves with socket read/write activity.

use std::time::Duration;

use crate::clock::Clock;
use crate::error::{RealtimeLinkError, Result};
use crate::http::HttpPost;
use crate::models::{LoginMethod, LoginRequest, LoginResponse};

/// Refresh fires once `expires_in / 1.2` of the token lifetime elapsed
/// (~83 %), as a fraction of the window rather than an absolute deadline.
const REFRESH_DIVISOR: f64 = 1.2;

/// Owns login credentials and the current access token.
///
/// The token is absent until the first successful login and replaced
/// wholesale on refresh, never merged.
pub struct CredentialManager {
    method: Option<LoginMethod>,
    identifier: String,
    secret: String,
    access_token: Option<String>,
    expires_in_ms: u64,
    obtained_at_ms: Option<u64>,
    login_retry_delay: Duration,
}

impl CredentialManager {
    /// Manager with no credentials; `login_retry_delay` paces the internal
    /// retry loop on transient login failures.
    pub fn new(login_retry_delay: Duration) -> Self {
        Self {
            method: None,
            identifier: String::new(),
            secret: String::new(),
            access_token: None,
            expires_in_ms: 0,
            obtained_at_ms: None,
            login_retry_delay,
        }
    }

    /// Store credentials and perform the blocking login.
    ///
    /// Retries indefinitely while no HTTP response is obtained at all
    /// (availability over latency: callers needing a bound must impose
    /// their own timeout); any definitive response ends the loop. Returns
    /// the HTTP status on success; a rejection, malformed body, or empty
    /// token is [`RealtimeLinkError::AuthRejected`] and leaves the stored
    /// token untouched.
    pub fn login(
        &mut self,
        http: &dyn HttpPost,
        clock: &dyn Clock,
        host: &str,
        api_key: &str,
        method: LoginMethod,
        identifier: &str,
        secret: &str,
    ) -> Result<u16> {
        self.method = Some(method);
        self.identifier = identifier.to_string();
        self.secret = secret.to_string();
        self.relogin(http, clock, host, api_key)
    }

    /// Re-run the blocking login with the stored credentials (token
    /// refresh path).
    pub fn relogin(
        &mut self,
        http: &dyn HttpPost,
        clock: &dyn Clock,
        host: &str,
        api_key: &str,
    ) -> Result<u16> {
        let method = self.method.ok_or_else(|| {
            RealtimeLinkError::ConfigurationError("login called before credentials were set".into())
        })?;

        let url = format!("https://{}/auth/v1/token?grant_type=password", host);
        let request = LoginRequest::new(method, &self.identifier, &self.secret);
        let body = serde_json::to_string(&request)
            .map_err(|e| RealtimeLinkError::ConfigurationError(e.to_string()))?;

        loop {
            let (status, response_body) = match http.post(&url, &[("apikey", api_key)], &body) {
                Ok(response) => response,
                Err(e) => {
                    // No response at all — transient, retry forever.
                    log::debug!("[realtime-link] Login got no response ({}), retrying", e);
                    if !self.login_retry_delay.is_zero() {
                        std::thread::sleep(self.login_retry_delay);
                    }
                    continue;
                }
            };

            if !(200..300).contains(&status) {
                log::warn!("[realtime-link] Login rejected with status {}", status);
                return Err(RealtimeLinkError::AuthRejected(format!(
                    "login failed with status {}",
                    status
                )));
            }

            let parsed: LoginResponse = match serde_json::from_str(&response_body) {
                Ok(parsed) => parsed,
                Err(e) => {
                    return Err(RealtimeLinkError::AuthRejected(format!(
                        "malformed login response: {}",
                        e
                    )));
                }
            };
            if !parsed.is_valid() {
                return Err(RealtimeLinkError::AuthRejected(
                    "login response missing access_token or expires_in".to_string(),
                ));
            }

            log::info!(
                "[realtime-link] Login successful, token valid for {}s",
                parsed.expires_in
            );
            self.access_token = Some(parsed.access_token);
            self.expires_in_ms = parsed.expires_in * 1000;
            self.obtained_at_ms = Some(clock.now_ms());
            return Ok(status);
        }
    }

    /// The current access token, absent until the first successful login.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Whether a login succeeded at some point (possibly with a token that
    /// has since gone stale — the retry loop keeps the previous token in
    /// place across failed refreshes).
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Whether login credentials were supplied.
    pub fn has_credentials(&self) -> bool {
        self.method.is_some()
    }

    /// Whether the refresh window elapsed. Never due before the first
    /// successful login.
    pub fn refresh_due(&self, now_ms: u64) -> bool {
        match self.obtained_at_ms {
            Some(obtained) if self.expires_in_ms > 0 => {
                let threshold = (self.expires_in_ms as f64 / REFRESH_DIVISOR) as u64;
                now_ms.saturating_sub(obtained) >= threshold
            }
            _ => false,
        }
    }
}
