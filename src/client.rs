//! Main realtime client with builder pattern.
//!
//! Provides the primary interface for configuring a channel session and
//! driving it from the host application's service loop.

use std::time::Duration;

use crate::auth::CredentialManager;
use crate::clock::{Clock, MonotonicClock};
use crate::error::{RealtimeLinkError, Result};
use crate::event_handlers::EventHandlers;
use crate::http::{HttpPost, ReqwestHttp};
use crate::models::LoginMethod;
use crate::registry::SubscriptionRegistry;
use crate::session::{Endpoint, Session, SessionState};
use crate::timeouts::RealtimeLinkTimeouts;
use crate::transport::{Transport, WsTransport};

/// Main realtime client.
///
/// Use [`RealtimeLinkClientBuilder`] to construct instances. The client is
/// single-threaded and cooperatively scheduled: the host application calls
/// [`tick`](RealtimeLinkClient::tick) on a regular cadence, and every state
/// transition happens synchronously inside that call (or inside the blocking
/// [`login`](RealtimeLinkClient::login)).
///
/// # Examples
///
/// ```rust,no_run
/// use realtime_link::{LoginMethod, RealtimeLinkClient};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut client = RealtimeLinkClient::builder()
///     .host("https://x.supabase.co")
///     .api_key("anon-key")
///     .on_change(|row| println!("Row change: {}", row))
///     .build()?;
///
/// client.login(LoginMethod::Email, "dev@example.com", "hunter2")?;
/// client.add_changes_listener("orders", "INSERT", "public", None);
/// client.listen();
///
/// loop {
///     client.tick();
///     std::thread::sleep(std::time::Duration::from_millis(100));
/// }
/// # }
/// ```
pub struct RealtimeLinkClient {
    endpoint: Endpoint,
    registry: SubscriptionRegistry,
    credentials: CredentialManager,
    http: Box<dyn HttpPost>,
    clock: Box<dyn Clock>,
    session: Session,
}

impl RealtimeLinkClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> RealtimeLinkClientBuilder {
        RealtimeLinkClientBuilder::new()
    }

    /// Blocking login with the given method and credentials.
    ///
    /// Retries indefinitely while no HTTP response is obtained at all;
    /// callers needing bounded latency must impose their own timeout.
    /// Returns the HTTP status on success; a definitive rejection is
    /// [`RealtimeLinkError::AuthRejected`]. On success the session resends
    /// the token alongside every heartbeat and refreshes it before expiry.
    pub fn login(&mut self, method: LoginMethod, identifier: &str, secret: &str) -> Result<u16> {
        self.credentials.login(
            self.http.as_ref(),
            self.clock.as_ref(),
            &self.endpoint.host,
            &self.endpoint.api_key,
            method,
            identifier,
            secret,
        )
    }

    /// Register one change filter for the next join. Registration order is
    /// preserved on the wire; an empty `filter` is recorded as absent.
    ///
    /// Registrations made while a join is active take effect on the next
    /// join only (call [`end`](Self::end) + [`listen`](Self::listen) to
    /// apply them immediately).
    pub fn add_changes_listener(
        &mut self,
        table: &str,
        event: &str,
        schema: &str,
        filter: Option<&str>,
    ) {
        self.registry
            .add_changes_listener(table, event, schema, filter);
    }

    /// Announce this device on the channel's presence (last write wins).
    pub fn announce_presence(&mut self, device_name: &str) {
        self.registry.announce_presence(device_name);
    }

    /// Open the socket and start the join sequence. Failures are recovered
    /// on later ticks; nothing is returned here.
    pub fn listen(&mut self) {
        self.session.listen(&self.endpoint);
    }

    /// One service tick. Evaluates, in priority order: (1) the credential
    /// refresh due-check — which may cycle the whole session and aborts the
    /// rest of the tick, (2) the heartbeat due-check, (3) inbound
    /// read/dispatch. Never panics or returns an error; faults are logged
    /// and surfaced through the optional `on_error` hook.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();

        if self.session.is_active() && self.credentials.refresh_due(now) {
            log::info!("[realtime-link] Access token nearing expiry, cycling the session");
            // Socket down first: the auth HTTP call must not interleave
            // with socket read/write activity.
            self.session.suspend_for_refresh();
            if let Err(e) = self.credentials.relogin(
                self.http.as_ref(),
                self.clock.as_ref(),
                &self.endpoint.host,
                &self.endpoint.api_key,
            ) {
                log::warn!(
                    "[realtime-link] Token refresh rejected, keeping previous token: {}",
                    e
                );
            }
            self.session.listen(&self.endpoint);
            return;
        }

        self.session
            .tick(now, &self.endpoint, &self.registry, &self.credentials);
    }

    /// Disconnect and release the transport. Registry and credentials are
    /// kept, so a later [`listen`](Self::listen) rejoins with the same
    /// configuration.
    pub fn end(&mut self) {
        self.session.end();
    }

    /// Whether the socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Current lifecycle state of the session.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }
}

/// Builder for configuring [`RealtimeLinkClient`] instances.
pub struct RealtimeLinkClientBuilder {
    host: Option<String>,
    api_key: Option<String>,
    handlers: EventHandlers,
    timeouts: RealtimeLinkTimeouts,
    transport: Option<Box<dyn Transport>>,
    http: Option<Box<dyn HttpPost>>,
    clock: Option<Box<dyn Clock>>,
}

impl RealtimeLinkClientBuilder {
    fn new() -> Self {
        Self {
            host: None,
            api_key: None,
            handlers: EventHandlers::new(),
            timeouts: RealtimeLinkTimeouts::default(),
            transport: None,
            http: None,
            clock: None,
        }
    }

    /// Set the broker host. Any scheme prefix is stripped.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the project API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Register the row-change consumer (shorthand for
    /// [`handlers`](Self::handlers) with only `on_change` set).
    pub fn on_change(
        mut self,
        f: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> Self {
        self.handlers = self.handlers.on_change(f);
        self
    }

    /// Set the full callback registry (row changes plus lifecycle hooks).
    pub fn handlers(mut self, handlers: EventHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Set the timing configuration.
    pub fn timeouts(mut self, timeouts: RealtimeLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Inject a transport implementation (defaults to the tungstenite
    /// socket).
    pub fn transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Inject an HTTP implementation (defaults to the blocking reqwest
    /// client).
    pub fn http(mut self, http: Box<dyn HttpPost>) -> Self {
        self.http = Some(http);
        self
    }

    /// Inject a clock (defaults to a monotonic system clock).
    pub fn clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<RealtimeLinkClient> {
        let host = self
            .host
            .ok_or_else(|| RealtimeLinkError::ConfigurationError("host is required".into()))?;
        let api_key = self
            .api_key
            .ok_or_else(|| RealtimeLinkError::ConfigurationError("api_key is required".into()))?;

        let endpoint = Endpoint::new(&host, &api_key);
        if endpoint.host.is_empty() {
            return Err(RealtimeLinkError::ConfigurationError(
                "host must not be empty".into(),
            ));
        }

        let transport: Box<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Box::new(WsTransport::new(
                self.timeouts.connection_timeout,
                self.timeouts.reconnect_delay,
            )),
        };
        let http: Box<dyn HttpPost> = match self.http {
            Some(http) => http,
            None => Box::new(ReqwestHttp::new(self.timeouts.connection_timeout)?),
        };
        let clock: Box<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Box::new(MonotonicClock::new()),
        };

        let session = Session::new(
            transport,
            self.handlers,
            self.timeouts.heartbeat_interval.as_millis() as u64,
        );

        Ok(RealtimeLinkClient {
            endpoint,
            registry: SubscriptionRegistry::new(),
            credentials: CredentialManager::new(self.timeouts.login_retry_delay),
            http,
            clock,
            session,
        })
    }
}
