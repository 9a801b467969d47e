//! Credential store
//!
//! Holds the short-lived access token shared by the request pipeline and the
//! realtime channel. The refresh token is not here: it lives in the HTTP
//! transport's cookie jar and request code never reads it.

use std::fmt;
use tokio::sync::watch;

/// Access token holder injected into the pipeline and the realtime channel
///
/// Writes replace the whole value; readers always see either the old or
/// the new token. `subscribe` notifies on every change.
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Current access token, if any
    fn access_token(&self) -> Option<String>;

    /// Replace the access token
    fn set(&self, token: String);

    /// Drop the access token
    fn clear(&self);

    /// Watch token changes
    fn subscribe(&self) -> watch::Receiver<Option<String>>;

    fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}

/// In-memory store backed by a `watch` channel
#[derive(Debug)]
pub struct MemoryCredentialStore {
    tx: watch::Sender<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Create a store already holding a token
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(token.into());
        store
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    fn set(&self, token: String) {
        // Same token again is not a change
        self.tx.send_if_modified(|current| {
            if current.as_deref() == Some(token.as_str()) {
                false
            } else {
                *current = Some(token);
                true
            }
        });
    }

    fn clear(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_clear_notify() {
        let store = MemoryCredentialStore::new();
        let mut rx = store.subscribe();
        assert!(!store.is_authenticated());

        store.set("T1".to_string());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_deref(), Some("T1"));
        assert_eq!(store.access_token().as_deref(), Some("T1"));

        store.clear();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
        assert!(store.access_token().is_none());
    }

    #[tokio::test]
    async fn test_identical_token_does_not_notify() {
        let store = MemoryCredentialStore::with_token("T1");
        let rx = store.subscribe();

        store.set("T1".to_string());
        assert!(!rx.has_changed().unwrap());

        // Clearing an empty store is silent too
        let empty = MemoryCredentialStore::new();
        let rx = empty.subscribe();
        empty.clear();
        assert!(!rx.has_changed().unwrap());
    }
}
