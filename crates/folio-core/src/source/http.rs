//! HTTP GET against the portfolio API.
//!
//! Uses the curl crate (libcurl). Each request runs on the blocking pool so
//! the async caller only suspends while waiting for the result.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::resource::ResourceId;
use crate::retry::FetchError;

use super::RemoteDataSource;

/// Remote data source backed by a JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    base_url: Url,
    connect_timeout: Duration,
    timeout: Duration,
}

impl HttpDataSource {
    /// `base_url` is the API root; resource paths are joined onto it.
    pub fn new(base_url: &str, connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url =
            Url::parse(&normalized).with_context(|| format!("invalid API base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot be a base: {}", base_url);
        }
        Ok(Self {
            base_url,
            connect_timeout,
            timeout,
        })
    }

    /// Full URL for a resource.
    pub fn url_for(&self, resource: ResourceId) -> Result<Url, FetchError> {
        self.base_url
            .join(resource.path())
            .map_err(|e| FetchError::Other(format!("bad resource URL: {}", e)))
    }
}

#[async_trait]
impl RemoteDataSource for HttpDataSource {
    async fn fetch(&self, resource: ResourceId, token: Option<&str>) -> Result<Value, FetchError> {
        let url = self.url_for(resource)?;
        let token = token.map(str::to_owned);
        let (connect_timeout, timeout) = (self.connect_timeout, self.timeout);
        tracing::debug!(%resource, %url, "GET");
        tokio::task::spawn_blocking(move || get_json(&url, token.as_deref(), connect_timeout, timeout))
            .await
            .map_err(|e| FetchError::Other(format!("request task join: {}", e)))?
    }
}

/// Performs the GET and decodes the body as JSON.
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
fn get_json(
    url: &Url,
    token: Option<&str>,
    connect_timeout: Duration,
    timeout: Duration,
) -> Result<Value, FetchError> {
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url.as_str()).map_err(fetch_error_from_curl)?;
    easy.follow_location(true).map_err(fetch_error_from_curl)?;
    easy.connect_timeout(connect_timeout)
        .map_err(fetch_error_from_curl)?;
    easy.timeout(timeout).map_err(fetch_error_from_curl)?;

    let mut list = curl::easy::List::new();
    list.append("Accept: application/json")
        .map_err(fetch_error_from_curl)?;
    if let Some(token) = token {
        list.append(&format!("Authorization: Bearer {}", token.trim()))
            .map_err(fetch_error_from_curl)?;
    }
    easy.http_headers(list).map_err(fetch_error_from_curl)?;

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(fetch_error_from_curl)?;
        transfer.perform().map_err(fetch_error_from_curl)?;
    }

    let code = easy.response_code().map_err(fetch_error_from_curl)?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(u16::try_from(code).unwrap_or(u16::MAX)));
    }

    parse_body(&body)
}

/// Decode a response body as JSON.
pub fn parse_body(body: &[u8]) -> Result<Value, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FetchError::Malformed("empty response body".to_string()));
    }
    serde_json::from_slice(body).map_err(|e| {
        let preview = String::from_utf8_lossy(&body[..body.len().min(64)]);
        FetchError::Malformed(format!("{} (body starts with {:?})", e, preview))
    })
}

/// Map a curl error to a fetch error: connectivity failures carry no status.
fn fetch_error_from_curl(e: curl::Error) -> FetchError {
    if e.is_operation_timedout() {
        return FetchError::timeout(e.to_string());
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return FetchError::offline(e.to_string());
    }
    FetchError::Other(e.to_string())
}
