//! Session state shared by the pipeline and the API wrappers
//!
//! Owns the credential store and the session event bus. The presentation
//! layer listens for [`SessionEvent::Ended`] and navigates to its login
//! entry point.

use crate::credential::CredentialStore;
use shared::client::UserInfo;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Refresh exchange failed
    RenewalFailed,
    /// Request rejected again with a freshly renewed token
    RejectedAfterRenewal,
    /// Explicit logout
    LoggedOut,
}

/// Session lifecycle events
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn { user: UserInfo },
    Renewed,
    Ended { reason: EndReason },
}

/// Credential store plus session event bus
#[derive(Debug, Clone)]
pub struct Session {
    store: Arc<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self { store, events }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn begin(&self, token: String, user: UserInfo) {
        self.store.set(token);
        tracing::info!(user_id = %user.id, "Session started");
        self.emit(SessionEvent::LoggedIn { user });
    }

    pub(crate) fn renewed(&self, token: String) {
        self.store.set(token);
        tracing::debug!("Access token renewed");
        self.emit(SessionEvent::Renewed);
    }

    pub(crate) fn end(&self, reason: EndReason) {
        self.store.clear();
        tracing::warn!(?reason, "Session ended");
        self.emit(SessionEvent::Ended { reason });
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(e) = self.events.send(event) {
            tracing::trace!("No session subscribers: {}", e);
        }
    }
}
