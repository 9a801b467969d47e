//! API Response types
//!
//! Envelope used by the list endpoints that wrap their payload.

use serde::{Deserialize, Serialize};

/// Wrapped API response
///
/// ```json
/// {
///     "success": true,
///     "code": 200,
///     "message": "OK",
///     "data": [ ... ],
///     "details": null
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    /// Response data (may be absent or null)
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            code: 200,
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }

    /// Unwrap the payload, falling back to `T::default()` when it is missing
    pub fn into_data_or_default(self) -> T
    where
        T: Default,
    {
        self.data.unwrap_or_default()
    }
}
