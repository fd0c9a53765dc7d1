//! Bidirectional translation between CoAP messages and HTTP
//! requests/responses.

pub mod content;
pub mod query;
pub mod request;
pub mod response;
pub mod status;

pub use request::translate_request;
pub use response::{ack_with_code, translate_response, TranslatedResponse, MAX_PACKET_LEN};
