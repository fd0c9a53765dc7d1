//! Static table between CoAP Content-Format IDs and HTTP content headers.

/// HTTP rendering of a CoAP Content-Format: a media type plus an optional
/// transfer encoding (empty string when the payload is not encoded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpContent {
    pub media_type: &'static str,
    pub encoding: &'static str,
}

/// Content-Format ID for deflate-compressed JSON (vendor range).
pub const APP_JSON_DEFLATE: u16 = 11050;

const TABLE: &[(u16, HttpContent)] = &[
    (
        0,
        HttpContent {
            media_type: "text/plain;charset=utf-8",
            encoding: "",
        },
    ),
    (
        40,
        HttpContent {
            media_type: "application/link-format",
            encoding: "",
        },
    ),
    (
        41,
        HttpContent {
            media_type: "application/xml",
            encoding: "",
        },
    ),
    (
        42,
        HttpContent {
            media_type: "application/octet-stream",
            encoding: "",
        },
    ),
    (
        47,
        HttpContent {
            media_type: "application/exi",
            encoding: "",
        },
    ),
    (
        50,
        HttpContent {
            media_type: "application/json",
            encoding: "",
        },
    ),
    (
        APP_JSON_DEFLATE,
        HttpContent {
            media_type: "application/json",
            encoding: "deflate",
        },
    ),
];

/// Everything up to the first `;`, so `text/plain;charset=utf-8`
/// compares equal to `text/plain`.
fn trim_charset(value: &str) -> &str {
    value.split(';').next().unwrap_or(value)
}

/// HTTP content headers for a CoAP Content-Format ID.
pub fn http_content(id: u16) -> Option<HttpContent> {
    TABLE
        .iter()
        .find(|(format, _)| *format == id)
        .map(|(_, content)| *content)
}

/// CoAP Content-Format ID for an HTTP Content-Type / Content-Encoding
/// pair. The charset suffix is ignored; an absent Content-Encoding
/// matches entries without one.
pub fn content_format(content_type: &str, content_encoding: &str) -> Option<u16> {
    let content_type = trim_charset(content_type);
    TABLE
        .iter()
        .find(|(_, content)| {
            trim_charset(content.media_type) == content_type
                && content.encoding == content_encoding
        })
        .map(|(format, _)| *format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_lookup() {
        assert_eq!(
            http_content(50),
            Some(HttpContent {
                media_type: "application/json",
                encoding: "",
            })
        );
        assert_eq!(http_content(0).unwrap().media_type, "text/plain;charset=utf-8");
        assert_eq!(http_content(APP_JSON_DEFLATE).unwrap().encoding, "deflate");
        assert_eq!(http_content(60), None);
    }

    #[test]
    fn reverse_lookup_strips_charset() {
        assert_eq!(content_format("text/plain", ""), Some(0));
        assert_eq!(content_format("text/plain;charset=utf-8", ""), Some(0));
        assert_eq!(content_format("application/xml", ""), Some(41));
        assert_eq!(content_format("application/xml;charset=iso-8859-1", ""), Some(41));
    }

    #[test]
    fn reverse_lookup_matches_encoding() {
        assert_eq!(content_format("application/json", ""), Some(50));
        assert_eq!(
            content_format("application/json", "deflate"),
            Some(APP_JSON_DEFLATE)
        );
        assert_eq!(content_format("application/json", "gzip"), None);
    }

    #[test]
    fn unknown_content_type() {
        assert_eq!(content_format("text/html", ""), None);
        assert_eq!(content_format("", ""), None);
    }

    #[test]
    fn table_roundtrip() {
        for (id, content) in TABLE {
            let found = content_format(content.media_type, content.encoding).unwrap();
            let back = http_content(found).unwrap();
            assert_eq!(found, *id);
            assert_eq!(trim_charset(back.media_type), trim_charset(content.media_type));
            assert_eq!(back.encoding, content.encoding);
        }
    }
}
