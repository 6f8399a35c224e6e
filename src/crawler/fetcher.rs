//! HTTP transport
//!
//! This module handles the raw requests of the scraper:
//! - The `Transport` seam every fetch goes through
//! - A `reqwest` implementation with per-request timeout, auth and headers
//! - One client per proxy, built on first use
//! - Error classification into status, timeout and network failures

use crate::config::{BasicAuth, ScraperConfig};
use crate::ScrapeError;
use async_trait::async_trait;
use reqwest::{Client, Method, Proxy};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const USER_AGENT: &str = concat!("trellis-scrape/", env!("CARGO_PKG_VERSION"));

/// One request as handed to a transport
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub timeout: Duration,
    pub auth: Option<BasicAuth>,
    pub headers: BTreeMap<String, String>,
    pub proxy: Option<String>,
}

impl FetchRequest {
    /// Builds a GET request carrying the run-wide request settings
    pub fn get(url: impl Into<String>, config: &ScraperConfig) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            timeout: config.timeout_duration(),
            auth: config.auth.clone(),
            headers: config.headers.clone(),
            proxy: config.proxy.clone(),
        }
    }
}

/// A successful (2xx) response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Response body
    pub data: Vec<u8>,
}

impl FetchResponse {
    /// The body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Performs single fetch attempts
///
/// Non-2xx responses must be reported as [`ScrapeError::Http`] so the retry
/// controller can classify them by status code.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ScrapeError>;
}

/// Builds an HTTP client, optionally routed through a proxy
///
/// Timeouts are applied per request, not here.
pub fn build_http_client(proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// `reqwest`-backed transport
pub struct HttpTransport {
    direct: Client,
    proxied: Mutex<HashMap<String, Client>>,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            direct: build_http_client(None)?,
            proxied: Mutex::new(HashMap::new()),
        })
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<Client, ScrapeError> {
        let Some(proxy) = proxy else {
            return Ok(self.direct.clone());
        };

        let mut proxied = self.proxied.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = proxied.get(proxy) {
            return Ok(client.clone());
        }

        let client = build_http_client(Some(proxy))?;
        proxied.insert(proxy.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ScrapeError> {
        let client = self.client_for(request.proxy.as_deref())?;

        let mut builder = client
            .request(request.method.clone(), &request.url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(auth) = &request.auth {
            builder = builder.basic_auth(&auth.username, auth.password.as_ref());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(&request.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Http {
                url: request.url,
                status: status.as_u16(),
            });
        }

        let url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let data = response
            .bytes()
            .await
            .map_err(|e| classify_error(&request.url, e))?;

        Ok(FetchResponse {
            url,
            status: status.as_u16(),
            content_type,
            data: data.to_vec(),
        })
    }
}

/// Maps a client error onto the scraper's failure kinds
fn classify_error(url: &str, error: reqwest::Error) -> ScrapeError {
    if error.is_timeout() {
        ScrapeError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status() {
        ScrapeError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        ScrapeError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
