//! Typed REST wrappers over the session pipeline

pub mod admin;
pub mod auth;
pub mod map;
pub mod rescue;

pub use admin::{AccountCursor, AdminApi};
pub use auth::AuthApi;
pub use map::MapApi;
pub use rescue::RescueApi;
