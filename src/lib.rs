//! # realtime-link: realtime broker client engine
//!
//! A client-side protocol engine for Phoenix-style channel brokers.
//! Maintains a persistent, authenticated WebSocket channel and delivers
//! parsed row-change events to an application callback.
//!
//! ## Features
//!
//! - **Row-change feeds**: register postgres-change filters and receive
//!   decoded change events
//! - **Presence**: announce a device name on the channel's presence
//! - **Authentication**: API key plus optional email/phone login with
//!   automatic token refresh before expiry
//! - **Keepalive**: periodic heartbeats with token resend while joined
//! - **Cooperative scheduling**: no background threads — the host drives
//!   one `tick()` call on a regular cadence and every transition happens
//!   inside it
//! - **Injectable collaborators**: transport, HTTP, and clock are traits,
//!   so the whole state machine is testable without network or real time
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use realtime_link::{LoginMethod, RealtimeLinkClient};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = RealtimeLinkClient::builder()
//!         .host("https://x.supabase.co")
//!         .api_key("anon-key")
//!         .on_change(|row| println!("Change detected: {}", row))
//!         .build()?;
//!
//!     client.login(LoginMethod::Email, "dev@example.com", "hunter2")?;
//!     client.add_changes_listener("orders", "INSERT", "public", None);
//!     client.announce_presence("kitchen-01");
//!     client.listen();
//!
//!     loop {
//!         client.tick();
//!         std::thread::sleep(std::time::Duration::from_millis(100));
//!     }
//! }
//! ```
//!
//! ## Lifecycle hooks
//!
//! ```rust,no_run
//! use realtime_link::{EventHandlers, RealtimeLinkClient};
//!
//! # fn example() -> realtime_link::Result<()> {
//! let handlers = EventHandlers::new()
//!     .on_change(|row| println!("{}", row))
//!     .on_connect(|| println!("Joined!"))
//!     .on_disconnect(|reason| println!("Dropped: {}", reason));
//!
//! let client = RealtimeLinkClient::builder()
//!     .host("x.supabase.co")
//!     .api_key("anon-key")
//!     .handlers(handlers)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod clock;
pub mod codec;
pub mod error;
pub mod event_handlers;
pub mod http;
pub mod models;
pub mod normalize;
pub mod registry;
pub mod session;
pub mod timeouts;
pub mod transport;

// Re-export main types for convenience
pub use client::{RealtimeLinkClient, RealtimeLinkClientBuilder};
pub use clock::{Clock, MonotonicClock};
pub use error::{RealtimeLinkError, Result};
pub use event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
pub use http::{HttpPost, ReqwestHttp};
pub use models::{ChangeSubscription, Envelope, JoinConfig, LoginMethod};
pub use registry::SubscriptionRegistry;
pub use session::{Endpoint, SessionState};
pub use timeouts::RealtimeLinkTimeouts;
pub use transport::{Transport, TransportEvent, WsTransport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
