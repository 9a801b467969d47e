// rescue-client/src/client.rs
// 客户端入口 - 组装凭证 / 会话 / 请求管线

use crate::api::{AdminApi, AuthApi, MapApi, RescueApi};
use crate::credential::{CredentialStore, MemoryCredentialStore};
use crate::http::{HttpTransport, ReqwestTransport, SessionPipeline};
use crate::realtime::RealtimeChannel;
use crate::session::{Session, SessionEvent};
use crate::{ClientConfig, ClientResult};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Rescue dispatch client
///
/// One credential store, one session event bus and one pipeline shared by
/// every API wrapper and realtime channel created from it.
///
/// ```no_run
/// # async fn demo() -> rescue_client::ClientResult<()> {
/// use rescue_client::{ClientConfig, RescueClient};
///
/// let client = RescueClient::new(ClientConfig::from_env())?;
/// client.auth().login("ops@rescue.example", "secret").await?;
///
/// let channel = client.realtime();
/// channel.seed(None).await;
/// channel.connect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RescueClient {
    config: ClientConfig,
    pipeline: SessionPipeline,
}

impl RescueClient {
    /// Client with an in-memory credential store and the reqwest transport
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Self::with_store(config, Arc::new(MemoryCredentialStore::new()))
    }

    /// Client with a caller-provided credential store
    pub fn with_store(config: ClientConfig, store: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, store, Arc::new(transport)))
    }

    /// Client over an arbitrary transport
    pub fn with_transport(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let pipeline = SessionPipeline::new(transport, Session::new(store));
        Self { config, pipeline }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &SessionPipeline {
        &self.pipeline
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.pipeline.clone())
    }

    pub fn admin(&self) -> AdminApi {
        AdminApi::new(self.pipeline.clone())
    }

    pub fn map(&self) -> MapApi {
        MapApi::new(self.pipeline.clone())
    }

    pub fn rescue(&self) -> RescueApi {
        RescueApi::new(self.pipeline.clone())
    }

    /// Spawn a realtime channel bound to this client's credentials
    pub fn realtime(&self) -> RealtimeChannel {
        RealtimeChannel::spawn(self.config.clone(), self.pipeline.clone())
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        self.pipeline.session().store()
    }

    pub fn session(&self) -> &Session {
        self.pipeline.session()
    }

    /// Session lifecycle events; `Ended` means re-authentication is needed
    pub fn subscribe_session(&self) -> broadcast::Receiver<SessionEvent> {
        self.pipeline.session().subscribe()
    }
}
