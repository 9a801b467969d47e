//! Rescue Request Model
//!
//! The dispatch table: incoming rescue requests, their current team
//! assignment, and the nearby-team lookup used to dispatch one.

use super::RescueStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default page size of the request table
pub const DEFAULT_REQUEST_PAGE_SIZE: u32 = 20;

/// Default nearby-team search radius (km)
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 20.0;

/// Team currently working a request (当前指派)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAssignment {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub team_phone: Option<String>,
    #[serde(default)]
    pub team_lat: Option<f64>,
    #[serde(default)]
    pub team_lng: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One row of the request table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescueRequest {
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    pub contact_phone: String,
    #[serde(default)]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub elderly: u32,
    #[serde(default)]
    pub people_summary: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub status: RescueStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub description_short: String,
    #[serde(default)]
    pub active_assignment: Option<ActiveAssignment>,
}

impl RescueRequest {
    pub fn is_assigned(&self) -> bool {
        self.active_assignment.is_some()
    }
}

/// Table filter; empty `search` and `status` are not sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescueFilter {
    pub page: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Default for RescueFilter {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_REQUEST_PAGE_SIZE,
            search: None,
            status: None,
        }
    }
}

impl RescueFilter {
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = (!term.trim().is_empty()).then_some(term);
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        let status = status.into();
        self.status = (!status.is_empty()).then_some(status);
        self
    }

    /// Query parameters; page fields always, filters only when set
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        pairs
    }
}

/// One page of the request table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescuePage {
    pub items: Vec<RescueRequest>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl RescuePage {
    /// Number of pages at this page size
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }
}

/// Status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescueStatusUpdate {
    pub status: String,
}

/// Team within the search radius, nearest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyTeam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    /// Distance to the request (km)
    pub distance: f64,
}

/// Dispatch a team to a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignTeam {
    pub request_id: String,
    pub rescue_team_id: String,
}

/// Dispatch acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
