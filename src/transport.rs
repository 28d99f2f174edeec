//! HTTP transport to the device.
//!
//! The session engine only needs two round trips, so it talks to the device
//! through the narrow [`Transport`] trait. [`HttpTransport`] is the reqwest
//! implementation; tests substitute an in-memory double.
//!
//! Flow Overview:
//! - Parse the configured base address into a [`DeviceTarget`].
//! - Build an [`HttpTransport`] from it (timeouts and user agent applied once).
//! - Call `get` / `post` with absolute paths such as `/login_sid.lua?version=2`.
//!
//! Transport failures never surface as errors: they produce a
//! [`TransportResponse`] without a status, which callers treat as "no data".

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info_span, Instrument};
use url::Url;

/// Address used when none is configured.
pub const DEFAULT_URL: &str = "http://fritz.box";

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub url: String,
    /// `None` when the request never completed (connect error, timeout, unreadable body).
    pub status: Option<StatusCode>,
    pub data: String,
}

impl TransportResponse {
    #[must_use]
    pub fn new(url: impl Into<String>, status: StatusCode, data: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            data: data.into(),
        }
    }

    #[must_use]
    pub fn unreachable(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            data: String::new(),
        }
    }

    /// The device only signals success with 200.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Some(StatusCode::OK)
    }

    /// Body of a successful response.
    #[must_use]
    pub fn ok_data(&self) -> Option<&str> {
        self.is_ok().then_some(self.data.as_str())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> TransportResponse;

    /// POST `form` as `application/x-www-form-urlencoded`, fields in the given order.
    async fn post(&self, path: &str, form: &[(&str, &str)]) -> TransportResponse;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn get(&self, path: &str) -> TransportResponse {
        (**self).get(path).await
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> TransportResponse {
        (**self).post(path, form).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    base_url: String,
}

impl DeviceTarget {
    /// Parse the device base address.
    /// # Errors
    /// Returns an error if the value is not an http(s) URL with a host.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if !(raw.starts_with("http://") || raw.starts_with("https://")) {
            return Err(anyhow!(
                "invalid device URL: expected http(s)://..., got {raw:?}"
            ));
        }

        // validate host and port once, requests reuse the string
        endpoint_url(raw, "/")?;

        Ok(Self {
            base_url: raw.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for DeviceTarget {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
        }
    }
}

/// Join `path` onto the scheme, host and port of `url`.
/// # Errors
/// Returns an error if `url` cannot be parsed, has no host, or uses an unsupported scheme.
pub fn endpoint_url(url: &str, path: &str) -> Result<String> {
    if !path.starts_with('/') {
        return Err(anyhow!("device path must start with /"));
    }

    let url = Url::parse(url)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {scheme}")),
        },
    };

    Ok(format!("{scheme}://{host}:{port}{path}"))
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    target: DeviceTarget,
}

impl HttpTransport {
    /// Build a transport for `target`.
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_target(user_agent: &str, target: DeviceTarget) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client, target })
    }

    #[must_use]
    pub fn target(&self) -> &DeviceTarget {
        &self.target
    }

    /// Full URL for `path` on the configured device.
    /// # Errors
    /// Returns an error if the path is invalid or the base URL cannot be parsed.
    pub fn endpoint_url(&self, path: &str) -> Result<String> {
        endpoint_url(self.target.base_url(), path)
    }

    async fn send(&self, url: String, request: reqwest::RequestBuilder) -> TransportResponse {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("request to {} failed: {}", url, e);
                return TransportResponse::unreachable(url);
            }
        };

        let status = response.status();

        match response.text().await {
            Ok(data) => {
                debug!("{} - {}", url, status);
                TransportResponse::new(url, status, data)
            }
            Err(e) => {
                error!("reading body from {} failed: {}", url, e);
                TransportResponse::unreachable(url)
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> TransportResponse {
        let url = match self.endpoint_url(path) {
            Ok(url) => url,
            Err(e) => {
                error!("invalid request path {}: {}", path, e);
                return TransportResponse::unreachable(path);
            }
        };

        let span = info_span!("fritzbox.get", http.method = "GET", url = %url);
        let request = self.client.get(&url);

        self.send(url, request).instrument(span).await
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> TransportResponse {
        let url = match self.endpoint_url(path) {
            Ok(url) => url,
            Err(e) => {
                error!("invalid request path {}: {}", path, e);
                return TransportResponse::unreachable(path);
            }
        };

        let span = info_span!("fritzbox.post", http.method = "POST", url = %url);
        let request = self.client.post(&url).form(form);

        self.send(url, request).instrument(span).await
    }
}
