// rescue-client/src/http/transport.rs
// HTTP 传输层 - 网络通信

use super::request::{ApiRequest, RawResponse};
use crate::{ClientConfig, ClientResult};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;

/// Sends one HTTP exchange
///
/// Implementations only move bytes: no retries, no status interpretation.
/// The session cookie (refresh credential) is the transport's business.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> ClientResult<RawResponse>;
}

/// reqwest-backed transport with a cookie jar
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = config.rest_base_url()?.to_string();
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> ClientResult<RawResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        tracing::trace!(method = %request.method, path = %request.path, %status, "HTTP exchange");
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let transport = ReqwestTransport::with_client(Client::new(), "http://127.0.0.1:8000/");
        assert_eq!(
            transport.url("/api/map-points"),
            "http://127.0.0.1:8000/api/map-points"
        );
    }

    #[test]
    fn test_transport_from_relative_config() {
        let config = crate::ClientConfig::new("/api").with_page_origin("https://admin.rescue.example");
        let transport = ReqwestTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "https://admin.rescue.example/");
    }
}
