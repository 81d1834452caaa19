//! Session state machine.
//!
//! Owns the transport handle and sequences join, auth, presence, heartbeat,
//! and recovery. Everything here runs synchronously inside the service tick
//! (or inside the blocking login call); there is no background thread.
//!
//! Lifecycle:
//!
//! 1. `listen` opens the socket against the broker endpoint
//! 2. the transport's Connected notification triggers the join sequence —
//!    join, then `access_token` (iff authenticated), then `presence` (iff
//!    configured), in that order
//! 3. each tick sends a heartbeat when due and drains inbound frames,
//!    dispatching row-change events to the application callback
//! 4. an unrequested drop parks the session in `Disconnected`; the next
//!    tick's poll re-drives the transport's own reconnect behavior
//!
//! Transport and decode faults are logged (and surfaced through the
//! optional `on_error` hook) but never propagate past the tick boundary.

use crate::auth::CredentialManager;
use crate::codec::{self, InboundFrame};
use crate::error::Result;
use crate::event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
use crate::normalize::normalize_host;
use crate::registry::SubscriptionRegistry;
use crate::transport::{Transport, TransportEvent};

/// TLS port of the hosted broker.
const BROKER_PORT: u16 = 443;

/// Protocol version marker embedded in the socket path.
const PROTOCOL_VERSION: &str = "1.0.0";

/// Broker endpoint, immutable after session start.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Bare broker hostname (scheme stripped at construction)
    pub host: String,
    /// Project API key
    pub api_key: String,
}

impl Endpoint {
    /// Create an endpoint, normalizing the host.
    pub fn new(host: &str, api_key: &str) -> Self {
        Self {
            host: normalize_host(host),
            api_key: api_key.to_string(),
        }
    }

    /// Socket path embedding the API key and protocol version marker.
    pub fn socket_path(&self) -> String {
        format!(
            "/realtime/v1/websocket?apikey={}&vsn={}",
            self.api_key, PROTOCOL_VERSION
        )
    }
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not listening; registry and credentials are kept.
    Idle,
    /// Socket opening or join sequence not yet sent.
    Connecting,
    /// Channel joined; heartbeats flowing, data frames dispatched.
    Joined,
    /// Transport dropped; waiting for its reconnect on a later tick.
    Disconnected,
}

/// The session state machine. Exclusively owns the transport handle.
pub(crate) struct Session {
    state: SessionState,
    transport: Box<dyn Transport>,
    handlers: EventHandlers,
    heartbeat_interval_ms: u64,
    next_heartbeat_ms: Option<u64>,
}

impl Session {
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        handlers: EventHandlers,
        heartbeat_interval_ms: u64,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            transport,
            handlers,
            heartbeat_interval_ms,
            next_heartbeat_ms: None,
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state != SessionState::Idle
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Open the socket against the broker. The join sequence is sent when
    /// the transport reports Connected (usually on the next poll).
    ///
    /// A transport failure here is logged, not returned: the transport
    /// keeps the endpoint and retries on later polls.
    pub(crate) fn listen(&mut self, endpoint: &Endpoint) {
        if self.state != SessionState::Idle {
            // Re-invoked listen starts a fresh join attempt.
            self.transport.disconnect();
        }
        self.state = SessionState::Connecting;
        self.next_heartbeat_ms = None;

        if let Err(e) = self
            .transport
            .open(&endpoint.host, BROKER_PORT, &endpoint.socket_path())
        {
            log::warn!("[realtime-link] Socket open failed: {}", e);
            self.handlers
                .emit_error(ConnectionError::new(e.to_string(), true));
        }
    }

    /// Disconnect and release the transport without clearing configuration;
    /// a later `listen` rejoins with the same registry and credentials.
    pub(crate) fn end(&mut self) {
        self.transport.disconnect();
        self.state = SessionState::Idle;
        self.next_heartbeat_ms = None;
    }

    /// Tear the socket down ahead of a credential refresh so the auth HTTP
    /// call never interleaves with socket read/write activity.
    pub(crate) fn suspend_for_refresh(&mut self) {
        log::debug!("[realtime-link] Suspending socket for token refresh");
        self.transport.disconnect();
        self.state = SessionState::Connecting;
        self.next_heartbeat_ms = None;
    }

    /// One service tick: heartbeat due-check, then inbound read/dispatch.
    /// The refresh due-check runs before this, in the client.
    pub(crate) fn tick(
        &mut self,
        now_ms: u64,
        endpoint: &Endpoint,
        registry: &SubscriptionRegistry,
        credentials: &CredentialManager,
    ) {
        if self.state == SessionState::Idle {
            return;
        }

        if self.state == SessionState::Joined {
            self.heartbeat_if_due(now_ms, credentials);
        }

        for event in self.transport.poll() {
            match event {
                TransportEvent::Connected => {
                    self.join(now_ms, endpoint, registry, credentials);
                }
                TransportEvent::Disconnected(reason) => {
                    log::info!("[realtime-link] Disconnected: {}", reason);
                    self.state = SessionState::Disconnected;
                    self.next_heartbeat_ms = None;
                    self.handlers.emit_disconnect(DisconnectReason::new(reason));
                }
                TransportEvent::Text(text) => {
                    self.handlers.emit_receive(&text);
                    self.dispatch(&text);
                }
                TransportEvent::Error(message) => {
                    log::warn!("[realtime-link] Transport error: {}", message);
                    self.handlers
                        .emit_error(ConnectionError::new(message, true));
                }
            }
        }
    }

    /// Send the join sequence: join, auth, presence — never reordered; the
    /// server's channel-scoped state depends on join preceding auth.
    fn join(
        &mut self,
        now_ms: u64,
        endpoint: &Endpoint,
        registry: &SubscriptionRegistry,
        credentials: &CredentialManager,
    ) {
        // The config snapshot is rebuilt from the live registry on every
        // join attempt, so registrations made before this point take effect.
        let config = registry.snapshot();
        let join = match codec::join_envelope(config, &endpoint.api_key) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("[realtime-link] Could not build join envelope: {}", e);
                return;
            }
        };

        if self.send_envelope(&join).is_err() {
            self.state = SessionState::Disconnected;
            return;
        }

        if let Some(token) = credentials.access_token() {
            if self.send_envelope(&codec::access_token_envelope(token)).is_err() {
                self.state = SessionState::Disconnected;
                return;
            }
        }

        if let Some(device) = registry.presence_device() {
            match codec::presence_envelope(device) {
                Ok(envelope) => {
                    if self.send_envelope(&envelope).is_err() {
                        self.state = SessionState::Disconnected;
                        return;
                    }
                }
                Err(e) => {
                    log::warn!("[realtime-link] Could not build presence envelope: {}", e);
                }
            }
        }

        log::info!(
            "[realtime-link] Channel joined ({} change filter(s), presence={})",
            registry.len(),
            registry.presence_device().is_some()
        );
        self.state = SessionState::Joined;
        self.next_heartbeat_ms = Some(now_ms + self.heartbeat_interval_ms);
        self.handlers.emit_connect();
    }

    /// Send the periodic heartbeat, resending the access token alongside it
    /// while authenticated to keep the server-side RLS context warm. A
    /// failed send is not retried; the next tick attempts again.
    fn heartbeat_if_due(&mut self, now_ms: u64, credentials: &CredentialManager) {
        let due = match self.next_heartbeat_ms {
            Some(due) => now_ms >= due,
            None => true,
        };
        if !due {
            return;
        }

        self.next_heartbeat_ms = Some(now_ms + self.heartbeat_interval_ms);

        if self.send_envelope(&codec::heartbeat_envelope()).is_err() {
            return;
        }
        if let Some(token) = credentials.access_token() {
            let _ = self.send_envelope(&codec::access_token_envelope(token));
        }
    }

    fn dispatch(&mut self, text: &str) {
        match codec::decode_frame(text) {
            Ok(InboundFrame::RowChange(data)) => {
                self.handlers.emit_change(&data);
            }
            Ok(InboundFrame::Other(_)) => {}
            Err(e) => {
                // Noise on a best-effort feed, not a reportable fault.
                log::debug!("[realtime-link] Dropping undecodable frame: {}", e);
            }
        }
    }

    fn send_envelope(&mut self, envelope: &crate::models::Envelope) -> Result<()> {
        let text = codec::encode(envelope)?;
        self.handlers.emit_send(&text);
        self.transport.send(&text).map_err(|e| {
            log::warn!("[realtime-link] Send failed ({}): {}", envelope.event, e);
            self.handlers
                .emit_error(ConnectionError::new(e.to_string(), true));
            e
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value as JsonValue};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const HEARTBEAT_MS: u64 = 25_000;

    /// Scriptable transport double with shared inspection handles.
    #[derive(Clone, Default)]
    struct MockHandles {
        opened: Arc<Mutex<Vec<(String, u16, String)>>>,
        sent: Arc<Mutex<Vec<String>>>,
        queued: Arc<Mutex<VecDeque<TransportEvent>>>,
        connected: Arc<AtomicBool>,
    }

    impl MockHandles {
        fn push_event(&self, event: TransportEvent) {
            self.queued.lock().unwrap().push_back(event);
        }

        fn sent_events(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|text| {
                    serde_json::from_str::<JsonValue>(text).unwrap()["event"]
                        .as_str()
                        .unwrap()
                        .to_string()
                })
                .collect()
        }

        fn sent_frames(&self) -> Vec<JsonValue> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|text| serde_json::from_str(text).unwrap())
                .collect()
        }
    }

    struct MockTransport {
        handles: MockHandles,
        /// Queue a Connected event as soon as open() is called.
        connect_on_open: bool,
    }

    impl Transport for MockTransport {
        fn open(&mut self, host: &str, port: u16, path: &str) -> crate::error::Result<()> {
            self.handles.opened.lock().unwrap().push((
                host.to_string(),
                port,
                path.to_string(),
            ));
            if self.connect_on_open {
                self.handles.connected.store(true, Ordering::SeqCst);
                self.handles.push_event(TransportEvent::Connected);
            }
            Ok(())
        }

        fn send(&mut self, text: &str) -> crate::error::Result<()> {
            self.handles.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn disconnect(&mut self) {
            self.handles.connected.store(false, Ordering::SeqCst);
            self.handles.queued.lock().unwrap().clear();
        }

        fn is_connected(&self) -> bool {
            self.handles.connected.load(Ordering::SeqCst)
        }

        fn poll(&mut self) -> Vec<TransportEvent> {
            self.handles.queued.lock().unwrap().drain(..).collect()
        }
    }

    fn session_with(handlers: EventHandlers) -> (Session, MockHandles) {
        let handles = MockHandles::default();
        let transport = MockTransport {
            handles: handles.clone(),
            connect_on_open: true,
        };
        (
            Session::new(Box::new(transport), handlers, HEARTBEAT_MS),
            handles,
        )
    }

    fn endpoint() -> Endpoint {
        Endpoint::new("https://x.supabase.co", "anon-key")
    }

    fn anonymous() -> CredentialManager {
        CredentialManager::new(Duration::ZERO)
    }

    fn authenticated(token: &str) -> CredentialManager {
        use crate::clock::Clock;
        use crate::http::HttpPost;

        struct OneShotHttp(String);
        impl HttpPost for OneShotHttp {
            fn post(
                &self,
                _url: &str,
                _headers: &[(&str, &str)],
                _body: &str,
            ) -> crate::error::Result<(u16, String)> {
                Ok((200, self.0.clone()))
            }
        }
        struct ZeroClock;
        impl Clock for ZeroClock {
            fn now_ms(&self) -> u64 {
                0
            }
        }

        let mut creds = CredentialManager::new(Duration::ZERO);
        creds
            .login(
                &OneShotHttp(format!(
                    r#"{{"access_token":"{}","expires_in":3600}}"#,
                    token
                )),
                &ZeroClock,
                "x.supabase.co",
                "anon-key",
                crate::models::LoginMethod::Email,
                "a@b.c",
                "pw",
            )
            .unwrap();
        creds
    }

    #[test]
    fn test_listen_opens_normalized_endpoint() {
        let (mut session, handles) = session_with(EventHandlers::new());

        session.listen(&endpoint());

        let opened = handles.opened.lock().unwrap();
        let (host, port, path) = &opened[0];
        assert_eq!(host, "x.supabase.co", "scheme must be stripped");
        assert_eq!(*port, 443);
        assert!(path.contains("apikey=anon-key"));
        assert!(path.contains("vsn=1.0.0"));
        assert_eq!(session.state(), SessionState::Connecting);
    }

    #[test]
    fn test_connected_sends_join_only_when_anonymous() {
        let (mut session, handles) = session_with(EventHandlers::new());
        let registry = SubscriptionRegistry::new();

        session.listen(&endpoint());
        session.tick(0, &endpoint(), &registry, &anonymous());

        assert_eq!(handles.sent_events(), vec!["phx_join"]);
        assert_eq!(session.state(), SessionState::Joined);
    }

    #[test]
    fn test_join_sequence_order_join_auth_presence() {
        let (mut session, handles) = session_with(EventHandlers::new());
        let mut registry = SubscriptionRegistry::new();
        registry.add_changes_listener("orders", "INSERT", "public", None);
        registry.announce_presence("kitchen-01");

        session.listen(&endpoint());
        session.tick(0, &endpoint(), &registry, &authenticated("jwt-1"));

        assert_eq!(
            handles.sent_events(),
            vec!["phx_join", "access_token", "presence"],
            "join must precede auth, auth must precede presence"
        );

        let frames = handles.sent_frames();
        assert_eq!(frames[0]["ref"], "1");
        assert_eq!(frames[1]["ref"], "3");
        assert_eq!(frames[1]["payload"]["access_token"], "jwt-1");
        assert_eq!(frames[2]["ref"], "2");
        assert_eq!(frames[2]["payload"]["payload"]["user"], "kitchen-01");
    }

    #[test]
    fn test_join_payload_reflects_registry_snapshot() {
        let (mut session, handles) = session_with(EventHandlers::new());
        let mut registry = SubscriptionRegistry::new();
        registry.add_changes_listener("orders", "INSERT", "public", Some("status=eq.open"));
        registry.add_changes_listener("devices", "*", "public", None);

        session.listen(&endpoint());
        session.tick(0, &endpoint(), &registry, &anonymous());

        let join = &handles.sent_frames()[0];
        assert_eq!(join["topic"], "realtime:*");
        assert_eq!(
            join["payload"]["config"]["postgres_changes"],
            json!([
                {"event": "INSERT", "schema": "public", "table": "orders", "filter": "status=eq.open"},
                {"event": "*", "schema": "public", "table": "devices"},
            ])
        );
        assert_eq!(join["payload"]["access_token"], "anon-key");
    }

    #[test]
    fn test_heartbeat_due_after_interval() {
        let (mut session, handles) = session_with(EventHandlers::new());
        let registry = SubscriptionRegistry::new();
        let creds = anonymous();
        let ep = endpoint();

        session.listen(&ep);
        session.tick(0, &ep, &registry, &creds); // join at t=0

        session.tick(HEARTBEAT_MS - 1, &ep, &registry, &creds);
        assert_eq!(
            handles.sent_events(),
            vec!["phx_join"],
            "heartbeat must not fire before the interval"
        );

        session.tick(HEARTBEAT_MS, &ep, &registry, &creds);
        assert_eq!(handles.sent_events(), vec!["phx_join", "heartbeat"]);
        assert_eq!(handles.sent_frames()[1]["topic"], "phoenix");
        assert_eq!(handles.sent_frames()[1]["ref"], "0");
    }

    #[test]
    fn test_heartbeat_resends_access_token_iff_authenticated() {
        let registry = SubscriptionRegistry::new();
        let ep = endpoint();

        // Authenticated: heartbeat + access_token
        let (mut session, handles) = session_with(EventHandlers::new());
        let creds = authenticated("jwt-1");
        session.listen(&ep);
        session.tick(0, &ep, &registry, &creds);
        session.tick(HEARTBEAT_MS, &ep, &registry, &creds);
        assert_eq!(
            handles.sent_events(),
            vec!["phx_join", "access_token", "heartbeat", "access_token"]
        );

        // Anonymous: heartbeat alone
        let (mut session, handles) = session_with(EventHandlers::new());
        let creds = anonymous();
        session.listen(&ep);
        session.tick(0, &ep, &registry, &creds);
        session.tick(HEARTBEAT_MS, &ep, &registry, &creds);
        assert_eq!(handles.sent_events(), vec!["phx_join", "heartbeat"]);
    }

    #[test]
    fn test_row_change_dispatches_exactly_once() {
        let seen: Arc<Mutex<Vec<JsonValue>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let handlers = EventHandlers::new().on_change(move |data| {
            seen_clone.lock().unwrap().push(data.clone());
        });
        let (mut session, handles) = session_with(handlers);
        let registry = SubscriptionRegistry::new();
        let creds = anonymous();
        let ep = endpoint();

        session.listen(&ep);
        session.tick(0, &ep, &registry, &creds);

        handles.push_event(TransportEvent::Text(
            r#"{"payload":{"data":{"table":"orders","record":{"id":7}}}}"#.to_string(),
        ));
        session.tick(1, &ep, &registry, &creds);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], json!({"table": "orders", "record": {"id": 7}}));
    }

    #[test]
    fn test_non_row_frames_do_not_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::<JsonValue>::new()));
        let seen_clone = seen.clone();
        let handlers = EventHandlers::new().on_change(move |data| {
            seen_clone.lock().unwrap().push(data.clone());
        });
        let (mut session, handles) = session_with(handlers);
        let registry = SubscriptionRegistry::new();
        let creds = anonymous();
        let ep = endpoint();

        session.listen(&ep);
        session.tick(0, &ep, &registry, &creds);

        handles.push_event(TransportEvent::Text(
            r#"{"payload":{"data":{"table":"null"}}}"#.to_string(),
        ));
        handles.push_event(TransportEvent::Text(
            r#"{"payload":{"data":{"type":"system"}}}"#.to_string(),
        ));
        handles.push_event(TransportEvent::Text("{not json".to_string()));
        session.tick(1, &ep, &registry, &creds);

        assert!(
            seen.lock().unwrap().is_empty(),
            "table 'null', table absent, and malformed frames must not dispatch"
        );
        assert_eq!(session.state(), SessionState::Joined, "noise must not break the session");
    }

    #[test]
    fn test_disconnect_event_parks_session() {
        let (mut session, handles) = session_with(EventHandlers::new());
        let registry = SubscriptionRegistry::new();
        let creds = anonymous();
        let ep = endpoint();

        session.listen(&ep);
        session.tick(0, &ep, &registry, &creds);
        assert_eq!(session.state(), SessionState::Joined);

        handles.push_event(TransportEvent::Disconnected("server closed".to_string()));
        session.tick(1, &ep, &registry, &creds);
        assert_eq!(session.state(), SessionState::Disconnected);

        // No heartbeat while disconnected; the transport owns reconnection.
        session.tick(HEARTBEAT_MS * 2, &ep, &registry, &creds);
        assert_eq!(handles.sent_events(), vec!["phx_join"]);
    }

    #[test]
    fn test_reconnect_event_replays_join_sequence() {
        let (mut session, handles) = session_with(EventHandlers::new());
        let mut registry = SubscriptionRegistry::new();
        registry.add_changes_listener("orders", "INSERT", "public", None);
        let creds = anonymous();
        let ep = endpoint();

        session.listen(&ep);
        session.tick(0, &ep, &registry, &creds);
        handles.push_event(TransportEvent::Disconnected("dropped".to_string()));
        session.tick(1, &ep, &registry, &creds);

        // Transport reconnects internally on a later poll.
        handles.push_event(TransportEvent::Connected);
        session.tick(2, &ep, &registry, &creds);

        assert_eq!(handles.sent_events(), vec!["phx_join", "phx_join"]);
        assert_eq!(session.state(), SessionState::Joined);
    }

    #[test]
    fn test_end_then_listen_replays_identical_join_payload() {
        let (mut session, handles) = session_with(EventHandlers::new());
        let mut registry = SubscriptionRegistry::new();
        registry.add_changes_listener("orders", "INSERT", "public", Some("id=gt.10"));
        registry.announce_presence("kitchen-01");
        let creds = anonymous();
        let ep = endpoint();

        session.listen(&ep);
        session.tick(0, &ep, &registry, &creds);
        let first_join = handles.sent_frames()[0].clone();

        session.end();
        assert_eq!(session.state(), SessionState::Idle);
        // Idle ticks are inert.
        session.tick(1, &ep, &registry, &creds);

        session.listen(&ep);
        session.tick(2, &ep, &registry, &creds);

        let frames = handles.sent_frames();
        let second_join = frames
            .iter()
            .filter(|f| f["event"] == "phx_join")
            .nth(1)
            .expect("second join")
            .clone();
        assert_eq!(
            second_join, first_join,
            "unchanged registry must replay the identical join payload"
        );
    }

    #[test]
    fn test_registry_mutation_applies_on_next_join() {
        let (mut session, handles) = session_with(EventHandlers::new());
        let mut registry = SubscriptionRegistry::new();
        registry.add_changes_listener("orders", "INSERT", "public", None);
        let creds = anonymous();
        let ep = endpoint();

        session.listen(&ep);
        session.tick(0, &ep, &registry, &creds);

        // Mutation while joined is not pushed retroactively...
        registry.add_changes_listener("devices", "*", "public", None);
        session.tick(1, &ep, &registry, &creds);
        assert_eq!(handles.sent_events(), vec!["phx_join"]);

        // ...but takes effect on the next join attempt.
        session.end();
        session.listen(&ep);
        session.tick(2, &ep, &registry, &creds);

        let frames = handles.sent_frames();
        let second_join = &frames[1];
        assert_eq!(
            second_join["payload"]["config"]["postgres_changes"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }
}
