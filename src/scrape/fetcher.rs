//! HTTP transport
//!
//! One fetch is one GET: the caller picks the egress proxy and user agent
//! per attempt, the fetcher maps transport failures onto the error taxonomy.
//! Proxies are a client-level concern, so a client is built lazily per
//! endpoint and cached for the life of the session.

use crate::config::FetchConfig;
use crate::proxy::ProxyAddress;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{header, Client, Proxy};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Raw fetch result, before extraction and validation
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    pub elapsed_ms: u64,
}

/// Transport seam, so the pipeline can be driven without a network
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        proxy: Option<&ProxyAddress>,
        user_agent: &str,
    ) -> Result<FetchResponse, FetchError>;
}

/// Production fetcher backed by reqwest
pub struct HttpFetcher {
    timeout: Duration,
    direct: Client,
    proxied: Mutex<HashMap<String, Client>>,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        Ok(Self {
            timeout,
            direct: build_client(timeout, None)?,
            proxied: Mutex::new(HashMap::new()),
        })
    }

    fn client_for(&self, proxy: Option<&ProxyAddress>) -> Result<Client, FetchError> {
        let Some(address) = proxy else {
            return Ok(self.direct.clone());
        };

        let mut clients = self.proxied.lock().unwrap();
        if let Some(client) = clients.get(address.url()) {
            return Ok(client.clone());
        }

        let client = build_client(self.timeout, Some(address))?;
        clients.insert(address.url().to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        proxy: Option<&ProxyAddress>,
        user_agent: &str,
    ) -> Result<FetchResponse, FetchError> {
        let client = self.client_for(proxy)?;
        let started = Instant::now();

        let response = client
            .get(url)
            .header(header::USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        Ok(FetchResponse {
            status: status.as_u16(),
            body,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Builds an HTTP client, optionally routed through a proxy endpoint
///
/// Compression negotiation is left to reqwest; setting Accept-Encoding by
/// hand would turn off its transparent decompression.
fn build_client(timeout: Duration, proxy: Option<&ProxyAddress>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .default_headers(browser_headers())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(address) = proxy {
        builder = builder.proxy(Proxy::all(address.url())?);
    }

    builder.build()
}

/// Headers a mainstream browser sends, minus the user agent (rotated per
/// request)
fn browser_headers() -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("en-US,en;q=0.9"),
    );
    // Accept-Encoding is managed by the client's gzip/brotli options;
    // setting it here would turn off automatic decompression
    headers.insert(header::DNT, header::HeaderValue::from_static("1"));
    headers.insert(
        header::CONNECTION,
        header::HeaderValue::from_static("keep-alive"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        header::HeaderValue::from_static("1"),
    );
    headers
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        // reqwest does not expose the resolver failure directly; the debug
        // form of the wrapped hyper error names it
        if format!("{:?}", error).to_lowercase().contains("dns") {
            FetchError::DnsFailure {
                url: url.to_string(),
            }
        } else {
            FetchError::ConnectionRefused {
                url: url.to_string(),
            }
        }
    } else if error.is_decode() {
        FetchError::Malformed {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Client(error)
    }
}
