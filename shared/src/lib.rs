//! Shared types for the rescue dispatch client
//!
//! Wire DTOs used by the client library and by any server (or test double)
//! speaking the same REST and stream protocol.

pub mod client;
pub mod models;
pub mod response;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{ClusterPoint, DetailPoint, GeoPoint, MapBounds, RescueStatus, StreamMessage};
pub use response::ApiResponse;
