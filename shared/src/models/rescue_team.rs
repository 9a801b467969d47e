//! Rescue Team Model

use serde::{Deserialize, Serialize};

/// Rescue team entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescueTeam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    pub status: String,
}

/// Update team payload (only present fields are sent)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RescueTeamUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
