//! Map Model
//!
//! Geo points as delivered by the bounded `map-points` query and by the
//! live `/ws/map/` stream. A point either carries an identity (detail) or
//! is an identity-less aggregate produced by server-side clustering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bounded query window plus zoom level
///
/// The server decides from `zoom` whether to answer with detail points or
/// clusters; the client never clusters on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
    pub zoom: u8,
}

impl Default for MapBounds {
    /// Whole operating region at a coarse zoom
    fn default() -> Self {
        Self {
            min_lat: 8.0,
            max_lat: 12.0,
            min_lng: 104.0,
            max_lng: 108.0,
            zoom: 10,
        }
    }
}

impl MapBounds {
    /// Query parameters in the order the backend documents them
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("min_lat", self.min_lat.to_string()),
            ("max_lat", self.max_lat.to_string()),
            ("min_lng", self.min_lng.to_string()),
            ("max_lng", self.max_lng.to_string()),
            ("zoom", self.zoom.to_string()),
        ]
    }
}

/// Rescue request status (救援状态)
///
/// Known values are matched case-insensitively; anything else is kept
/// verbatim so newer server states survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RescueStatus {
    Pending,
    Processing,
    Finished,
    Other(String),
}

impl RescueStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RescueStatus::Pending => "pending",
            RescueStatus::Processing => "processing",
            RescueStatus::Finished => "finished",
            RescueStatus::Other(s) => s,
        }
    }
}

impl From<String> for RescueStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pending" => RescueStatus::Pending,
            "processing" => RescueStatus::Processing,
            "finished" => RescueStatus::Finished,
            _ => RescueStatus::Other(s),
        }
    }
}

impl From<RescueStatus> for String {
    fn from(status: RescueStatus) -> Self {
        match status {
            RescueStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RescueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single rescue request with identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailPoint {
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(deserialize_with = "coordinate::deserialize")]
    pub latitude: f64,
    #[serde(deserialize_with = "coordinate::deserialize")]
    pub longitude: f64,
    pub status: RescueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adults: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elderly: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    /// Absent or 1 for a detail point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

/// Aggregate of many detail points collapsed at low zoom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPoint {
    #[serde(deserialize_with = "coordinate::deserialize")]
    pub latitude: f64,
    #[serde(deserialize_with = "coordinate::deserialize")]
    pub longitude: f64,
    pub total: u32,
}

/// A located entity on the live map
///
/// Detail is tried first: anything carrying an `id` is a detail point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoPoint {
    Detail(DetailPoint),
    Cluster(ClusterPoint),
}

impl GeoPoint {
    /// Identity used for merging; clusters have none
    pub fn id(&self) -> Option<&str> {
        match self {
            GeoPoint::Detail(p) => Some(&p.id),
            GeoPoint::Cluster(_) => None,
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, GeoPoint::Cluster(_))
    }

    pub fn latitude(&self) -> f64 {
        match self {
            GeoPoint::Detail(p) => p.latitude,
            GeoPoint::Cluster(c) => c.latitude,
        }
    }

    pub fn longitude(&self) -> f64 {
        match self {
            GeoPoint::Detail(p) => p.longitude,
            GeoPoint::Cluster(c) => c.longitude,
        }
    }

    /// Number of requests this point stands for
    pub fn count(&self) -> u32 {
        match self {
            GeoPoint::Detail(p) => p.total.unwrap_or(1),
            GeoPoint::Cluster(c) => c.total,
        }
    }
}

/// One frame of the live map stream
///
/// An array replaces the whole point set; a single object is merged by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamMessage {
    Batch(Vec<GeoPoint>),
    Single(GeoPoint),
}

impl StreamMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Coordinates arrive as JSON numbers or as decimal strings
mod coordinate {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
        }
    }
}
