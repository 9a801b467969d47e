// rescue-client/src/api/auth.rs
// 认证接口 - 登录 / 登出 / 注册

use crate::ClientResult;
use crate::http::{ApiRequest, SessionPipeline};
use crate::session::EndReason;
use shared::client::{LoginRequest, LoginResponse, RegisterRequest, UserInfo};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const REGISTER_PATH: &str = "/api/auth/register";

/// Authentication endpoints
#[derive(Debug, Clone)]
pub struct AuthApi {
    pipeline: SessionPipeline,
}

impl AuthApi {
    pub fn new(pipeline: SessionPipeline) -> Self {
        Self { pipeline }
    }

    /// Log in with an email or phone number
    ///
    /// A 401 here means bad credentials and is returned as
    /// [`ClientError::Unauthorized`](crate::ClientError::Unauthorized)
    /// without attempting renewal. The refresh cookie set by the server is
    /// kept by the transport.
    pub async fn login(&self, identifier: &str, password: &str) -> ClientResult<UserInfo> {
        let request = ApiRequest::post(LOGIN_PATH)
            .json(&LoginRequest {
                identifier: identifier.to_string(),
                password: password.to_string(),
            })?
            .without_renewal();

        let resp: LoginResponse = self.pipeline.execute_json(request).await?;
        self.pipeline
            .session()
            .begin(resp.access_token, resp.user.clone());
        Ok(resp.user)
    }

    /// Log out
    ///
    /// The local session always ends, even when the server call fails.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self
            .pipeline
            .execute_empty(ApiRequest::post(LOGOUT_PATH))
            .await;
        if let Err(ref e) = result {
            tracing::warn!("Logout request failed, clearing session anyway: {}", e);
        }
        self.pipeline.session().end(EndReason::LoggedOut);
        result
    }

    pub async fn register(&self, email: &str, password: &str) -> ClientResult<()> {
        let request = ApiRequest::post(REGISTER_PATH)
            .json(&RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?
            .without_renewal();
        self.pipeline.execute_empty(request).await
    }
}
