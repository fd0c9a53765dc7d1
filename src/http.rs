//! HTTP request/response data types and the reqwest-backed transport.
//!
//! `ProxyRequest` and `BackendResponse` double as the cache blob format:
//! both derive serde and are bincode-serialized into the assembly and
//! session caches, so a cached response replays byte-for-byte.

use std::time::Duration;

use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HOST};
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// User-Agent presented to the backend on every proxied request.
pub const USER_AGENT: &str = "crosscoap/1.0";

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("unsupported HTTP method {0:?}")]
    Method(String),
}

type Result<T> = std::result::Result<T, HttpError>;

/// An HTTP request assembled from a CoAP message, ready for the backend.
///
/// The target transport address is dictated by the URL; `host` only
/// overrides the `Host` header (virtual-host routing on the backend).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub method: String,
    pub url: String,
    pub host: Option<String>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub body: Vec<u8>,
}

/// A fully materialized backend response: status, headers, buffered body.
///
/// The body is read once into memory so the same bytes serve both the
/// immediate translation and the Block2 session cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl BackendResponse {
    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or("")
    }

    pub fn content_encoding(&self) -> &str {
        self.header("content-encoding").unwrap_or("")
    }
}

/// Backend HTTP transport. Cheaply cloneable; the inner reqwest client
/// pools connections across handlers.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client with a total per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Perform the request and buffer the full response body.
    pub async fn execute(&self, request: &ProxyRequest) -> Result<BackendResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| HttpError::Method(request.method.clone()))?;

        let mut builder = self
            .client
            .request(method, request.url.clone())
            .body(request.body.clone());
        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(content_encoding) = &request.content_encoding {
            builder = builder.header(CONTENT_ENCODING, content_encoding);
        }
        if let Some(host) = &request.host {
            builder = builder.header(HOST, host);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(BackendResponse {
            status,
            headers,
            body,
        })
    }
}
