//! Request and response values passed through the pipeline

use crate::{ClientError, ClientResult};
use http::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A replayable API request
///
/// Owns everything needed to send it again after a credential renewal;
/// the bearer header is attached per attempt, never stored here.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Whether a 401 may trigger the refresh exchange
    pub renewable: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            renewable: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ClientResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Exclude this request from credential renewal
    pub fn without_renewal(mut self) -> Self {
        self.renewable = false;
        self
    }
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ClientError::InvalidResponse(format!(
                "{} (status {}, {} bytes)",
                e,
                self.status,
                self.body.len()
            ))
        })
    }

    /// Map a non-success status to an error
    pub fn into_result(self) -> ClientResult<Self> {
        if self.status.is_success() {
            Ok(self)
        } else if self.status == StatusCode::UNAUTHORIZED {
            Err(ClientError::Unauthorized)
        } else {
            let body = self.text();
            Err(ClientError::Status {
                status: self.status,
                body,
            })
        }
    }
}
