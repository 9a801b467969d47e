//! Data models
//!
//! Shared between the client library and the backend (via API).

pub mod account;
pub mod map;
pub mod rescue_request;
pub mod rescue_team;

// Re-exports
pub use account::*;
pub use map::*;
pub use rescue_request::*;
pub use rescue_team::*;
