//! Realtime map synchronization
//!
//! REST seed and live stream feed one point set.

pub mod channel;
pub mod endpoint;
pub mod points;
pub mod reconnect;

pub use channel::{ChannelState, RealtimeChannel};
pub use endpoint::{STREAM_PATH, stream_base, stream_url};
pub use points::{MergeOutcome, PointSet, PointSnapshot};
pub use reconnect::{ReconnectPolicy, ReconnectSlot};
