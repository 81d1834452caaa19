//! Timing configuration for the session.

use std::time::Duration;

/// Timing configuration for the session's three timers and the production
/// collaborators.
///
/// # Examples
///
/// ```rust
/// use realtime_link::RealtimeLinkTimeouts;
/// use std::time::Duration;
///
/// // Use defaults (recommended for most cases)
/// let timeouts = RealtimeLinkTimeouts::default();
///
/// // Faster heartbeat for aggressive proxies
/// let timeouts = RealtimeLinkTimeouts::builder()
///     .heartbeat_interval(Duration::from_secs(20))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct RealtimeLinkTimeouts {
    /// Interval between heartbeat envelopes while joined.
    /// Default: 25 seconds
    pub heartbeat_interval: Duration,

    /// Delay between login attempts when no HTTP response is obtained.
    /// Default: 1 second
    pub login_retry_delay: Duration,

    /// Timeout for establishing the socket (TCP + TLS handshake).
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Minimum delay between the transport's internal reconnect attempts.
    /// Default: 1 second
    pub reconnect_delay: Duration,
}

impl Default for RealtimeLinkTimeouts {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(25),
            login_retry_delay: Duration::from_secs(1),
            connection_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl RealtimeLinkTimeouts {
    /// Create a new builder for custom timing configuration.
    pub fn builder() -> RealtimeLinkTimeoutsBuilder {
        RealtimeLinkTimeoutsBuilder::new()
    }
}

/// Builder for creating custom [`RealtimeLinkTimeouts`] configurations.
#[derive(Debug, Clone)]
pub struct RealtimeLinkTimeoutsBuilder {
    timeouts: RealtimeLinkTimeouts,
}

impl RealtimeLinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: RealtimeLinkTimeouts::default(),
        }
    }

    /// Set the heartbeat interval.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.timeouts.heartbeat_interval = interval;
        self
    }

    /// Set the heartbeat interval in seconds.
    pub fn heartbeat_interval_secs(self, secs: u64) -> Self {
        self.heartbeat_interval(Duration::from_secs(secs))
    }

    /// Set the delay between transient login retries.
    pub fn login_retry_delay(mut self, delay: Duration) -> Self {
        self.timeouts.login_retry_delay = delay;
        self
    }

    /// Set the connection timeout (TCP + TLS handshake).
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    /// Set the connection timeout in seconds.
    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    /// Set the minimum delay between internal reconnect attempts.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.timeouts.reconnect_delay = delay;
        self
    }

    /// Build the timing configuration.
    pub fn build(self) -> RealtimeLinkTimeouts {
        self.timeouts
    }
}
