//! Stream endpoint resolution
//!
//! REST calls may go through the page's reverse proxy; the stream does
//! not, so its target is resolved separately:
//!
//! 1. explicit `stream_base`, used as given (path prefix kept)
//! 2. absolute `api_base`, host only, scheme upgraded
//! 3. development: the local backend (`wss` when the page is https)
//! 4. page origin, scheme upgraded

use crate::{ClientConfig, ClientError, ClientResult};
use url::Url;

/// Stream path on the backend
pub const STREAM_PATH: &str = "/ws/map/";

/// Resolve the stream base (scheme, host, optional path prefix)
pub fn stream_base(config: &ClientConfig) -> ClientResult<Url> {
    if let Some(explicit) = config.stream_base.as_deref() {
        let mut url = Url::parse(explicit.trim())?;
        upgrade_scheme(&mut url)?;
        return Ok(url);
    }

    if let Some(api_base) = config.absolute_api_base() {
        return host_only(api_base);
    }

    if config.is_development() {
        let scheme = if config.page_origin.starts_with("https://") {
            "wss"
        } else {
            "ws"
        };
        return Ok(Url::parse(&format!("{scheme}://{}", config.dev_stream_host))?);
    }

    host_only(&config.page_origin)
}

/// Full stream target with the access token as query parameter
///
/// The handshake cannot carry an Authorization header, hence the query.
/// The result contains the token: never log it.
pub fn stream_url(config: &ClientConfig, token: &str) -> ClientResult<Url> {
    let mut url = stream_base(config)?;
    let path = format!("{}{}", url.path().trim_end_matches('/'), STREAM_PATH);
    url.set_path(&path);
    url.query_pairs_mut().clear().append_pair("token", token);
    Ok(url)
}

fn host_only(raw: &str) -> ClientResult<Url> {
    let mut url = Url::parse(raw.trim())?;
    upgrade_scheme(&mut url)?;
    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn upgrade_scheme(url: &mut Url) -> ClientResult<()> {
    let upgraded = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ClientError::Config(format!(
                "cannot derive a stream endpoint from scheme '{other}'"
            )));
        }
    };
    url.set_scheme(upgraded).map_err(|_| {
        ClientError::Config(format!("failed to switch '{}' to {upgraded}", url.as_str()))
    })
}
