//! Error types for realtime-link.

use thiserror::Error;

/// Errors that can occur in realtime client operations.
#[derive(Error, Debug)]
pub enum RealtimeLinkError {
    /// Misconfiguration reported at the call site (missing host or API key,
    /// listening before the client was configured).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Transport-level failure: connection refused, dropped, or a failed
    /// frame send. Recovered by the transport's own reconnect behavior plus
    /// the next service tick; never propagates past the tick boundary.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Definitive login rejection from the auth endpoint (bad credentials,
    /// malformed response body, empty token). The only login failure a
    /// caller observes; transient no-response failures are retried
    /// internally and never surfaced.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// Inbound frame that could not be decoded. Produced by the codec API
    /// but swallowed (debug-logged) by the session, which treats undecodable
    /// frames as noise on a best-effort feed.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}

/// Result type for realtime client operations.
pub type Result<T> = std::result::Result<T, RealtimeLinkError>;
