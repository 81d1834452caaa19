//! Data models for realtime-link.
//!
//! Defines the wire envelope, channel join configuration, and login
//! request/response structures exchanged with the broker.

pub mod change_subscription;
pub mod envelope;
pub mod join_config;
pub mod join_payload;
pub mod login_request;
pub mod login_response;
pub mod presence_track;


pub use change_subscription::ChangeSubscription;
pub use envelope::Envelope;
pub use join_config::{JoinConfig, PresenceConfig};
pub use join_payload::JoinPayload;
pub use login_request::{LoginMethod, LoginRequest};
pub use login_response::LoginResponse;
pub use presence_track::{PresenceTrack, PresenceTrackInfo};
