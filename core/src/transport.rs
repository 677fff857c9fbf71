//! Transport seam between workers and the HTTP client
//!
//! The engine only requires a blocking-style "perform one request"
//! operation; everything about TLS, pooling and protocol negotiation stays
//! behind [`Transport`]. Tests substitute mocks at the same seam.

use crate::config::RunConfig;
use crate::dns::{DnsCache, DnsError};
use crate::request::ScriptRequest;
use crate::response::ResponseDescriptor;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Per-request transport errors
///
/// All of these are recovered locally: they fail the one request and never
/// terminate a worker.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP/network error (connect, timeout, protocol)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The script produced an unparseable URL
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The script produced an invalid HTTP method
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    /// Name resolution failed or returned nothing
    #[error(transparent)]
    Dns(#[from] DnsError),
}

/// Performs one request and describes the response
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatch the request and read the full response body.
    async fn perform(&self, request: &ScriptRequest) -> Result<ResponseDescriptor, TransportError>;
}

/// reqwest-backed transport shared by all workers
pub struct HttpTransport {
    client: reqwest::Client,
    dns_cache: Option<Arc<DnsCache>>,
}

impl HttpTransport {
    /// Build a client from the run configuration.
    pub fn new(config: &RunConfig) -> Result<Self, TransportError> {
        // keepalive=false empties the idle pool so no connection is reused;
        // no `Connection: close` header is sent, so the server end may stay
        // open until its own idle timeout.
        let idle_per_host = if config.keepalive { 64 } else { 0 };
        let client = reqwest::Client::builder()
            .gzip(config.compression)
            .pool_max_idle_per_host(idle_per_host)
            .build()?;

        let dns_cache = config.cache_dns.then(|| Arc::new(DnsCache::new()));

        Ok(Self { client, dns_cache })
    }

    /// The DNS cache in use, if resolution caching is enabled.
    pub fn dns_cache(&self) -> Option<&Arc<DnsCache>> {
        self.dns_cache.as_ref()
    }

    async fn target_url(&self, raw: &str) -> Result<Url, TransportError> {
        let mut url = Url::parse(raw)?;

        if let Some(cache) = &self.dns_cache {
            if let Some(host) = url.host_str().map(str::to_owned) {
                let resolved = cache.resolve(&host).await?;
                if resolved != host {
                    // set_host accepts bracketed IPv6 literals.
                    url.set_host(Some(&resolved))?;
                }
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(&self, request: &ScriptRequest) -> Result<ResponseDescriptor, TransportError> {
        let url = self.target_url(&request.url).await?;

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::InvalidMethod(request.method.clone()))?;

        let mut builder = self.client.request(method, url);
        for (name, values) in &request.headers {
            for value in values.iter() {
                builder = builder.header(name, value);
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_ascii_lowercase())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let body = response.bytes().await?.to_vec();

        Ok(ResponseDescriptor {
            status,
            headers,
            body,
        })
    }
}
