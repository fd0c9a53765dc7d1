//! HTTP status code to CoAP response code mapping
//! (draft-ietf-core-http-mapping).

use coap_lite::ResponseType;

/// CoAP response code for an HTTP status. Statuses without a defined
/// mapping fall back to 2.05 Content.
pub fn response_code(status: u16) -> ResponseType {
    match status {
        200 => ResponseType::Content,
        201 => ResponseType::Created,
        204 => ResponseType::Content,
        304 => ResponseType::Valid,
        400 => ResponseType::BadRequest,
        401 => ResponseType::Unauthorized,
        403 => ResponseType::Forbidden,
        404 => ResponseType::NotFound,
        405 => ResponseType::MethodNotAllowed,
        406 => ResponseType::NotAcceptable,
        412 => ResponseType::PreconditionFailed,
        413 => ResponseType::RequestEntityTooLarge,
        415 => ResponseType::UnsupportedContentFormat,
        500 => ResponseType::InternalServerError,
        501 => ResponseType::NotImplemented,
        502 => ResponseType::BadGateway,
        503 => ResponseType::ServiceUnavailable,
        504 => ResponseType::GatewayTimeout,
        _ => ResponseType::Content,
    }
}
