//! HTTP response to CoAP response translation, with datagram-size
//! accounting.

use coap_lite::error::MessageError;
use coap_lite::{CoapOption, MessageClass, MessageType, Packet, ResponseType};

use crate::block::{block_option, carve, set_block_option, BlockValue};
use crate::http::{BackendResponse, HttpError};
use crate::options;

use super::{content, status};

/// Ceiling on emitted CoAP datagrams, inherited from typical link MTU.
pub const MAX_PACKET_LEN: usize = 1500;

/// A translated CoAP response plus what happened to the body on the way.
pub struct TranslatedResponse {
    pub message: Packet,
    /// The HTTP body did not fit in a single datagram and was clipped.
    pub truncated: bool,
    /// Header serialization failed and the response was downgraded
    /// to 5.00 with the Content-Format stripped.
    pub encode_error: Option<MessageError>,
}

impl TranslatedResponse {
    fn plain(message: Packet) -> Self {
        Self {
            message,
            truncated: false,
            encode_error: None,
        }
    }
}

/// Acknowledgement skeleton echoing the request's messageID and token.
pub fn ack_with_code(request: &Packet, code: ResponseType) -> Packet {
    let mut message = Packet::new();
    message.header.set_type(MessageType::Acknowledgement);
    message.header.message_id = request.header.message_id;
    message.set_token(request.get_token().to_vec());
    message.header.code = MessageClass::Response(code);
    message
}

/// Build the CoAP response for a backend result. `backend` is `None`
/// (and `error` set) when the HTTP call failed entirely; that case maps
/// to 5.03 with an empty payload and no Content-Format.
///
/// Block options are read off the originating request: a Block1 option
/// is echoed back, a Block2 option selects the slice of the body to
/// return (the session cache already holds the full body).
pub fn translate_response(
    backend: Option<&BackendResponse>,
    error: Option<&HttpError>,
    request: &Packet,
) -> TranslatedResponse {
    let mut message = ack_with_code(request, ResponseType::ServiceUnavailable);

    let backend = match (backend, error) {
        (Some(backend), None) => backend,
        _ => return TranslatedResponse::plain(message),
    };
    let mut body: &[u8] = &backend.body;

    if let Some(block1) = block_option(request, CoapOption::Block1) {
        set_block_option(&mut message, CoapOption::Block1, block1);
    }
    if let Some(block2) = block_option(request, CoapOption::Block2) {
        let (slice, more) = carve(body, block2);
        body = slice;
        set_block_option(&mut message, CoapOption::Block2, BlockValue { more, ..block2 });
    }

    message.header.code = MessageClass::Response(status::response_code(backend.status));
    if let Some(id) =
        content::content_format(backend.content_type(), backend.content_encoding())
    {
        options::set_uint_option(&mut message, CoapOption::ContentFormat, u32::from(id));
    }

    // Measure the headers alone; the payload separator costs one byte.
    let header_bytes = match message.to_bytes() {
        Ok(bytes) => bytes,
        Err(err) => {
            message.header.code = MessageClass::Response(ResponseType::InternalServerError);
            message.clear_option(CoapOption::ContentFormat);
            return TranslatedResponse {
                message,
                truncated: false,
                encode_error: Some(err),
            };
        }
    };
    let bytes_left = MAX_PACKET_LEN.saturating_sub(header_bytes.len() + 1);
    let truncated = body.len() > bytes_left;
    message.payload = if truncated {
        body[..bytes_left].to_vec()
    } else {
        body.to_vec()
    };

    TranslatedResponse {
        message,
        truncated,
        encode_error: None,
    }
}
