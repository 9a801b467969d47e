//! Account Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

/// Account entity (管理后台账号)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Create account payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCreate {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_password: Option<String>,
    pub role_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Toggle active payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountActiveUpdate {
    pub is_active: bool,
}

/// One page of a cursor-paginated account listing
///
/// `next_cursor == None` means the listing is exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPage {
    pub items: Vec<Account>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}
