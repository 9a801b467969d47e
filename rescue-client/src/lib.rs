//! Rescue Client - session-aware API client and live map channel
//!
//! - [`http::SessionPipeline`]: bearer attachment, single coalesced renewal
//!   on 401, one replay
//! - [`realtime::RealtimeChannel`]: REST-seeded point set kept current by
//!   the `/ws/map/` stream, with reconnect and credential-change handling
//! - [`api`]: typed wrappers for auth, admin, dispatch and map endpoints

pub mod api;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod logger;
pub mod realtime;
pub mod session;

pub use client::RescueClient;
pub use config::{ClientConfig, Environment};
pub use credential::{CredentialStore, MemoryCredentialStore};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use crate::http::{ApiRequest, HttpTransport, RawResponse, SessionPipeline};
pub use realtime::{ChannelState, RealtimeChannel, ReconnectPolicy};
pub use session::{EndReason, Session, SessionEvent};

// Re-export shared types for convenience
pub use shared::client::{LoginResponse, UserInfo};
pub use shared::models::{GeoPoint, MapBounds, RescueStatus};
