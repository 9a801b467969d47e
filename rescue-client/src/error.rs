//! Client error types

use http::StatusCode;
use std::sync::Arc;
use thiserror::Error;

/// Coarse failure class reported across the library boundary
///
/// Callers decide what to show ("session ended", "live updates
/// unavailable") from the kind; the error itself keeps the original cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network unreachable, timeout, connection reset
    Transport,
    /// Credential rejected
    Authorization,
    /// Refresh exchange failed; the session is over
    Renewal,
    /// Any other non-success HTTP status
    Http,
    /// Stream handshake or runtime failure
    Stream,
    /// Payload could not be decoded
    Malformed,
    /// Endpoint or configuration problem
    Config,
}

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a status was received
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection-level failure reported by a non-reqwest transport
    #[error("Connection error: {0}")]
    Connection(String),

    /// Non-success status other than an authorization failure
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// 401 on a request that is not eligible for renewal (login, refresh)
    #[error("Authentication required")]
    Unauthorized,

    /// Request rejected again after the credential was renewed
    #[error("Session expired")]
    SessionExpired,

    /// Refresh exchange failed
    #[error("Credential renewal failed: {0}")]
    RenewalFailed(#[source] Arc<ClientError>),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stream handshake or socket error
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(Box::new(err))
    }
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Http(e) if e.is_decode() => ErrorKind::Malformed,
            ClientError::Http(_) | ClientError::Connection(_) => ErrorKind::Transport,
            ClientError::Status { .. } => ErrorKind::Http,
            ClientError::Unauthorized | ClientError::SessionExpired => ErrorKind::Authorization,
            ClientError::RenewalFailed(_) => ErrorKind::Renewal,
            ClientError::InvalidResponse(_) | ClientError::Serialization(_) => {
                ErrorKind::Malformed
            }
            ClientError::WebSocket(_) => ErrorKind::Stream,
            ClientError::InvalidUrl(_) | ClientError::Config(_) => ErrorKind::Config,
        }
    }

    /// The session was torn down as a consequence of this error
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            ClientError::SessionExpired | ClientError::RenewalFailed(_)
        )
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Unauthorized | ClientError::SessionExpired => {
                Some(StatusCode::UNAUTHORIZED)
            }
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
