//! Request and response body handling.
//!
//! The encode path turns a [`RequestBody`] into a [`Payload`] the transport can
//! send, adding a JSON content type when the caller sends a structured value
//! without one. The decode path turns whatever the transport received into
//! [`ResponseData`], either as the caller asked or by inspecting the
//! response's content type.

mod decode;
mod encode;

pub use decode::{
    DecodeError, RawResponse, ResponseData, ResponseType, UnknownResponseType, decode_body,
};
pub use encode::{FormData, Payload, RequestBody, encode_body, prepare_headers};

const CONTENT_TYPE_JSON: &str = "application/json";

/// Matches the media types which are handled as JSON.
pub(crate) fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with(CONTENT_TYPE_JSON)
}

/// Matches the media types which are handled as opaque binary.
pub(crate) fn is_binary_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("application/octet")
}
