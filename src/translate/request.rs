//! CoAP request to HTTP request translation.

use coap_lite::{CoapOption, MessageClass, Packet, RequestType};
use url::Url;

use crate::http::ProxyRequest;
use crate::options;

use super::{content, query};

/// HTTP method name for a CoAP request code. Only the four CoAP method
/// codes 0.01-0.04 translate.
pub fn method_name(code: &MessageClass) -> Option<&'static str> {
    match code {
        MessageClass::Request(RequestType::Get) => Some("GET"),
        MessageClass::Request(RequestType::Post) => Some("POST"),
        MessageClass::Request(RequestType::Put) => Some("PUT"),
        MessageClass::Request(RequestType::Delete) => Some("DELETE"),
        _ => None,
    }
}

/// URI-Query option values, skipping any that are not valid UTF-8.
pub fn query_values(packet: &Packet) -> Vec<String> {
    packet
        .get_option(CoapOption::UriQuery)
        .map(|values| {
            values
                .iter()
                .filter_map(|raw| String::from_utf8(raw.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// URI-Path segments joined with `/` (no leading slash). `None` if any
/// segment is not valid UTF-8.
fn joined_path(packet: &Packet) -> Option<String> {
    let segments = match packet.get_option(CoapOption::UriPath) {
        Some(values) => values
            .iter()
            .map(|raw| std::str::from_utf8(raw).ok())
            .collect::<Option<Vec<_>>>()?,
        None => Vec::new(),
    };
    Some(segments.join("/"))
}

/// Every `%` must introduce a two-digit hex escape. Segments are passed
/// through otherwise untouched; the codec already yielded them decoded.
fn valid_escapes(path: &str) -> bool {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

fn with_final_slash(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_owned()
    } else {
        format!("{prefix}/")
    }
}

/// Build the backend HTTP request for a CoAP request message. `None`
/// means the request cannot be formed (unknown method, undecodable
/// path, invalid URL) and the caller should answer 4.00.
pub fn translate_request(request: &Packet, backend_prefix: &str) -> Option<ProxyRequest> {
    let method = method_name(&request.header.code)?;

    let path = joined_path(request)?;
    if !valid_escapes(&path) {
        return None;
    }
    let queries = query_values(request);
    let url = format!(
        "{}{}{}",
        with_final_slash(backend_prefix),
        path,
        query::query_string(queries.iter().map(String::as_str)),
    );
    Url::parse(&url).ok()?;

    let host = options::first_value(request, CoapOption::UriHost)
        .and_then(|raw| String::from_utf8(raw.clone()).ok());

    let (mut content_type, mut content_encoding) = (None, None);
    if let Some(id) = options::uint_option(request, CoapOption::ContentFormat) {
        if let Some(http) = u16::try_from(id).ok().and_then(content::http_content) {
            content_type = Some(http.media_type.to_owned());
            if !http.encoding.is_empty() {
                content_encoding = Some(http.encoding.to_owned());
            }
        }
    }

    Some(ProxyRequest {
        method: method.to_owned(),
        url,
        host,
        content_type,
        content_encoding,
        body: request.payload.clone(),
    })
}
