//! Session request pipeline
//!
//! Every outbound call goes through [`SessionPipeline::execute`]: the
//! current access token is attached, a 401 triggers one renewal through the
//! refresh cookie, and the original request is replayed exactly once.
//! Concurrent 401s share a single in-flight refresh exchange.

use super::request::{ApiRequest, RawResponse};
use super::transport::HttpTransport;
use crate::session::{EndReason, Session};
use crate::{ClientError, ClientResult};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use http::StatusCode;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use shared::client::RefreshResponse;
use std::fmt;
use std::sync::Arc;

/// Refresh exchange endpoint; the refresh token rides in the cookie jar
pub const REFRESH_PATH: &str = "/api/auth/refresh";

type RenewalOutcome = Result<String, Arc<ClientError>>;
type SharedRenewal = Shared<BoxFuture<'static, RenewalOutcome>>;

/// Credential-aware request executor
#[derive(Clone)]
pub struct SessionPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    transport: Arc<dyn HttpTransport>,
    session: Session,
    renewal: Mutex<RenewalSlot>,
}

/// At most one refresh exchange in flight
#[derive(Default)]
struct RenewalSlot {
    in_flight: Option<(u64, SharedRenewal)>,
    next_id: u64,
}

impl fmt::Debug for SessionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPipeline")
            .field("transport", &self.inner.transport)
            .field("authenticated", &self.inner.session.is_authenticated())
            .field("renewing", &self.inner.renewal.lock().in_flight.is_some())
            .finish()
    }
}

impl SessionPipeline {
    pub fn new(transport: Arc<dyn HttpTransport>, session: Session) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                transport,
                session,
                renewal: Mutex::new(RenewalSlot::default()),
            }),
        }
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Send a request, renewing the credential once on 401
    ///
    /// Transport failures and non-401 statuses are returned unchanged and
    /// never trigger renewal. A 401 on the replay ends the session.
    pub async fn execute(&self, request: ApiRequest) -> ClientResult<RawResponse> {
        let presented = self.inner.session.access_token();
        let response = self
            .inner
            .transport
            .send(&request, presented.as_deref())
            .await?;

        if response.status != StatusCode::UNAUTHORIZED {
            return response.into_result();
        }
        if !request.renewable {
            return Err(ClientError::Unauthorized);
        }

        tracing::debug!(method = %request.method, path = %request.path, "401, renewing credential");
        let token = self.renewed_token(presented.as_deref()).await?;

        let replay = self.inner.transport.send(&request, Some(&token)).await?;
        if replay.status == StatusCode::UNAUTHORIZED {
            tracing::warn!(method = %request.method, path = %request.path, "Rejected after renewal");
            // Only the first request to observe this ends the session
            if self.inner.session.access_token().as_deref() == Some(token.as_str()) {
                self.inner.session.end(EndReason::RejectedAfterRenewal);
            }
            return Err(ClientError::SessionExpired);
        }
        replay.into_result()
    }

    /// Send and decode a JSON body
    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        self.execute(request).await?.json()
    }

    /// Send and discard the body
    pub async fn execute_empty(&self, request: ApiRequest) -> ClientResult<()> {
        self.execute(request).await.map(|_| ())
    }

    /// Token to replay with after `presented` was rejected
    async fn renewed_token(&self, presented: Option<&str>) -> ClientResult<String> {
        let renewal = {
            let mut slot = self.inner.renewal.lock();
            if let Some((_, existing)) = &slot.in_flight {
                existing.clone()
            } else {
                match (presented, self.inner.session.access_token()) {
                    // Renewed by someone else since this request was sent
                    (_, Some(current)) if presented != Some(current.as_str()) => {
                        return Ok(current);
                    }
                    // Session ended since this request was sent
                    (Some(_), None) => return Err(ClientError::SessionExpired),
                    _ => {}
                }
                slot.next_id += 1;
                let id = slot.next_id;
                let renewal = spawn_renewal(self.inner.clone(), id);
                slot.in_flight = Some((id, renewal.clone()));
                renewal
            }
        };

        renewal.await.map_err(ClientError::RenewalFailed)
    }
}

impl PipelineInner {
    fn finish_renewal(&self, id: u64) {
        let mut slot = self.renewal.lock();
        if slot.in_flight.as_ref().is_some_and(|(current, _)| *current == id) {
            slot.in_flight = None;
        }
    }
}

/// Run the exchange on its own task so it completes even when every
/// waiter is dropped; the task clears the slot when done
fn spawn_renewal(inner: Arc<PipelineInner>, id: u64) -> SharedRenewal {
    let task = tokio::spawn(async move {
        let outcome = refresh_exchange(inner.transport.clone(), inner.session.clone()).await;
        inner.finish_renewal(id);
        outcome
    });

    async move {
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(Arc::new(ClientError::Connection(format!(
                "renewal task aborted: {e}"
            )))),
        }
    }
    .boxed()
    .shared()
}

/// The refresh exchange itself, shared by every waiter
async fn refresh_exchange(transport: Arc<dyn HttpTransport>, session: Session) -> RenewalOutcome {
    let request = ApiRequest::post(REFRESH_PATH).without_renewal();

    let result = async {
        let response = transport.send(&request, None).await?.into_result()?;
        let refreshed: RefreshResponse = response.json()?;
        if refreshed.access_token.is_empty() {
            return Err(ClientError::InvalidResponse(
                "refresh returned an empty access token".into(),
            ));
        }
        Ok(refreshed.access_token)
    }
    .await;

    match result {
        Ok(token) => {
            session.renewed(token.clone());
            Ok(token)
        }
        Err(e) => {
            tracing::warn!("Credential renewal failed: {}", e);
            session.end(EndReason::RenewalFailed);
            Err(Arc::new(e))
        }
    }
}
