//! Per-datagram orchestration: classify the CoAP message, translate,
//! drive the block engine and caches, call the backend, answer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use coap_lite::{CoapOption, MessageClass, MessageType, Packet, ResponseType};
use tokio::net::UdpSocket;
use tracing::{error, info, warn};

use crate::block::{block_option, set_block_option};
use crate::cache::{assembly_key, session_key, ByteCache, DEFAULT_MAX_AGE, DEFAULT_MAX_SIZE};
use crate::http::{BackendResponse, HttpClient, HttpError, ProxyRequest};
use crate::translate::request::{method_name, query_values};
use crate::translate::{ack_with_code, translate_request, translate_response};

/// Tracing target carrying one line per received CoAP request. The
/// binary routes this target to the access-log sink.
pub const ACCESS_LOG_TARGET: &str = "crosscoap::access";

/// Default timeout for requests to the HTTP backend.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid backend URL: {0}")]
    Backend(#[from] url::ParseError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, ProxyError>;

/// Startup configuration. Immutable once the proxy is built.
pub struct ProxyConfig {
    /// Base URL of the HTTP backend requests are proxied to.
    pub backend_url: String,
    pub http_timeout: Duration,
    pub cache_max_size: u64,
    pub cache_max_age: Duration,
}

impl ProxyConfig {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            cache_max_size: DEFAULT_MAX_SIZE,
            cache_max_age: DEFAULT_MAX_AGE,
        }
    }
}

/// Why the backend result could not be produced.
enum FetchError {
    Backend(HttpError),
    CorruptEntry(bincode::Error),
}

/// The translating proxy. One instance is shared by every handler task.
pub struct Proxy {
    backend_url: String,
    http: HttpClient,
    cache: ByteCache,
}

impl Proxy {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        url::Url::parse(&config.backend_url)?;
        Ok(Self {
            backend_url: config.backend_url,
            http: HttpClient::new(config.http_timeout)?,
            cache: ByteCache::new(config.cache_max_size, config.cache_max_age),
        })
    }

    /// Accept CoAP datagrams on `socket` forever, one handler task per
    /// datagram. Returns only if the socket itself fails.
    pub async fn serve(self: Arc<Self>, socket: UdpSocket) -> Result<()> {
        let socket = Arc::new(socket);
        let mut buf = [0u8; 2048];
        loop {
            let (len, peer) = socket.recv_from(&mut buf).await?;
            let raw = Bytes::copy_from_slice(&buf[..len]);
            let proxy = Arc::clone(&self);
            let socket = Arc::clone(&socket);
            // A handler panic is confined to its task.
            tokio::spawn(async move {
                let request = match Packet::from_bytes(&raw) {
                    Ok(packet) => packet,
                    Err(_) => return, // drop undecodable datagrams
                };
                if !matches!(request.header.code, MessageClass::Request(_)) {
                    return;
                }
                if let Some(response) = proxy.handle(&request, peer).await {
                    match response.to_bytes() {
                        Ok(bytes) => {
                            let _ = socket.send_to(&bytes, peer).await;
                        }
                        Err(err) => error!("failed to encode response for {peer}: {err:?}"),
                    }
                }
            });
        }
    }

    /// Handle one decoded CoAP request. Returns the response message for
    /// confirmable requests, `None` otherwise (the backend call still
    /// runs for non-confirmable requests).
    pub async fn handle(&self, request: &Packet, peer: SocketAddr) -> Option<Packet> {
        let confirmable = request.header.get_type() == MessageType::Confirmable;
        info!(
            target: ACCESS_LOG_TARGET,
            "{}: CoAP {} URI-Path={} URI-Query={:?}",
            peer,
            method_name(&request.header.code).unwrap_or("UNKNOWN"),
            lossy_path(request),
            query_values(request),
        );

        let mut backend_request = match translate_request(request, &self.backend_url) {
            Some(translated) => translated,
            None => {
                return confirmable.then(|| ack_with_code(request, ResponseType::BadRequest));
            }
        };

        // Block1: fold this fragment into the assembly slot. The backend
        // is not contacted until the final fragment arrives.
        if let Some(block1) = block_option(request, CoapOption::Block1) {
            let key = assembly_key(&backend_request.method, &backend_request.url);
            match self.absorb_fragment(&key, &backend_request) {
                Ok(assembled) => {
                    if block1.more {
                        return confirmable.then(|| {
                            let mut response = ack_with_code(request, ResponseType::Continue);
                            set_block_option(&mut response, CoapOption::Block1, block1);
                            response
                        });
                    }
                    self.cache.remove(&key);
                    backend_request = assembled;
                }
                Err(err) => {
                    error!("dropping corrupt upload state for {key}: {err}");
                    self.cache.remove(&key);
                    return confirmable
                        .then(|| ack_with_code(request, ResponseType::InternalServerError));
                }
            }
        }

        // Block2 downloads amortize one materialized response over the
        // whole session; everything else goes straight to the backend.
        let result = if block_option(request, CoapOption::Block2).is_some() {
            self.fetch_session(&backend_request).await
        } else {
            self.http
                .execute(&backend_request)
                .await
                .map_err(FetchError::Backend)
        };

        let (backend_response, backend_error) = match result {
            Ok(response) => (Some(response), None),
            Err(FetchError::Backend(err)) => {
                error!("error on HTTP request: {err}");
                (None, Some(err))
            }
            Err(FetchError::CorruptEntry(err)) => {
                error!("corrupt cached response for {}: {err}", backend_request.url);
                return confirmable
                    .then(|| ack_with_code(request, ResponseType::InternalServerError));
            }
        };

        if !confirmable {
            return None;
        }

        let translated =
            translate_response(backend_response.as_ref(), backend_error.as_ref(), request);
        if let Some(err) = &translated.encode_error {
            error!("error translating HTTP to CoAP: {err:?}");
        }
        if translated.truncated {
            let full = backend_response.map(|r| r.body.len()).unwrap_or(0);
            warn!(
                "CoAP payload truncated from {full} bytes to {} bytes",
                translated.message.payload.len()
            );
        }
        Some(translated.message)
    }

    /// Append one Block1 fragment to the assembly slot for `key` and
    /// return the request assembled so far.
    fn absorb_fragment(
        &self,
        key: &str,
        fragment: &ProxyRequest,
    ) -> std::result::Result<ProxyRequest, bincode::Error> {
        let mut assembled = match self.cache.get(key) {
            Some(blob) => bincode::deserialize::<ProxyRequest>(&blob)?,
            None => {
                let mut first = fragment.clone();
                first.body.clear();
                first
            }
        };
        assembled.body.extend_from_slice(&fragment.body);
        self.cache.set(key, bincode::serialize(&assembled)?);
        Ok(assembled)
    }

    /// Backend response for a Block2 exchange: replayed from the session
    /// cache when possible, fetched and cached otherwise. A replay
    /// rewrites the entry to extend the session's lifetime.
    async fn fetch_session(
        &self,
        request: &ProxyRequest,
    ) -> std::result::Result<BackendResponse, FetchError> {
        let key = session_key(&request.method, &request.url);
        if let Some(blob) = self.cache.get(&key) {
            match bincode::deserialize::<BackendResponse>(&blob) {
                Ok(response) => {
                    self.cache.set(&key, blob);
                    return Ok(response);
                }
                Err(err) => {
                    self.cache.remove(&key);
                    return Err(FetchError::CorruptEntry(err));
                }
            }
        }
        let response = self
            .http
            .execute(request)
            .await
            .map_err(FetchError::Backend)?;
        match bincode::serialize(&response) {
            Ok(blob) => self.cache.set(&key, blob),
            Err(err) => return Err(FetchError::CorruptEntry(err)),
        }
        Ok(response)
    }
}

/// URI-Path for the access log; lossy so undecodable segments still
/// leave a trace.
fn lossy_path(request: &Packet) -> String {
    request
        .get_option(CoapOption::UriPath)
        .map(|segments| {
            segments
                .iter()
                .map(|raw| String::from_utf8_lossy(raw))
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}
