//! crosscoap is a proxy+translator server that listens for incoming
//! CoAP requests over UDP, translates them to HTTP requests which are
//! proxied to a backend, and translates the responses back to CoAP (if
//! the CoAP client request was confirmable).
//!
//! Block1 uploads are reassembled across exchanges before a single
//! backend call; Block2 downloads carve one cached backend response
//! into client-sized blocks.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use crosscoap::{Proxy, ProxyConfig};
//! use tokio::net::UdpSocket;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let socket = UdpSocket::bind("0.0.0.0:5683").await?;
//!     let proxy = Arc::new(Proxy::new(ProxyConfig::new("http://127.0.0.1:8000/"))?);
//!     proxy.serve(socket).await?;
//!     Ok(())
//! }
//! ```

pub mod block;
pub mod cache;
pub mod http;
pub mod options;
pub mod proxy;
pub mod translate;

pub use block::BlockValue;
pub use cache::ByteCache;
pub use http::{BackendResponse, HttpClient, HttpError, ProxyRequest};
pub use proxy::{Proxy, ProxyConfig, ProxyError, ACCESS_LOG_TARGET};
pub use translate::{translate_request, translate_response, TranslatedResponse};
