use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::prelude::*;

use super::{is_binary_content_type, is_json_content_type};
use crate::platform::IS_BROWSER;

/// How the response body should be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Decide from the response's `content-type`.
    #[default]
    Auto,
    /// The body as text.
    Text,
    /// The body parsed as JSON.
    Json,
    /// The raw body bytes.
    Buffer,
    /// The raw body bytes. Identical to [`ResponseType::Buffer`] once decoded.
    #[serde(rename = "arraybuffer")]
    ArrayBuffer,
}

impl ResponseType {
    /// Returns the lower-case name of the response type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Text => "text",
            Self::Json => "json",
            Self::Buffer => "buffer",
            Self::ArrayBuffer => "arraybuffer",
        }
    }

    /// Resolves [`ResponseType::Auto`] into a concrete type using the
    /// response's content type. Concrete types are returned unchanged.
    #[must_use]
    pub fn resolve(self, content_type: Option<&str>) -> Self {
        if self != Self::Auto {
            return self;
        }
        match content_type {
            Some(ct) if is_binary_content_type(ct) => Self::binary(),
            Some(ct) if is_json_content_type(ct) => Self::Json,
            _ => Self::Text,
        }
    }

    /// The binary response type native to the current environment.
    #[must_use]
    pub fn binary() -> Self {
        if IS_BROWSER {
            Self::ArrayBuffer
        } else {
            Self::Buffer
        }
    }

    fn is_binary(self) -> bool {
        matches!(self, Self::Buffer | Self::ArrayBuffer)
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The string did not name a known [`ResponseType`].
#[derive(Debug, Snafu)]
#[snafu(display("Unknown response type: {value}"))]
pub struct UnknownResponseType {
    value: String,
}

impl FromStr for ResponseType {
    type Err = UnknownResponseType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "buffer" => Ok(Self::Buffer),
            "arraybuffer" => Ok(Self::ArrayBuffer),
            _ => UnknownResponseTypeSnafu { value: s }.fail(),
        }
    }
}

/// The body as the transport received it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Raw body bytes.
    Bytes(Bytes),
    /// A body the transport has already parsed.
    Structured(Value),
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// A text body.
    Text(String),
    /// A parsed JSON body.
    Json(Value),
    /// A binary body.
    Binary(Bytes),
}

impl ResponseData {
    /// Returns the text, if this is a text body.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the JSON value, if this is a JSON body.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a binary body.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Deserializes a JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a JSON body of the expected shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        match self {
            Self::Json(value) => T::deserialize(value).context(DecodeSnafu),
            Self::Text(text) => serde_json::from_str(text).context(DecodeSnafu),
            Self::Binary(bytes) => serde_json::from_slice(bytes).context(DecodeSnafu),
        }
    }
}

/// The response body could not be parsed as JSON.
#[derive(Debug, Snafu)]
#[snafu(display("Response body is not valid JSON"))]
pub struct DecodeError {
    source: serde_json::Error,
}

/// Decodes a response body.
///
/// `raw` and `text` are what the transport exposes as its response and
/// response text. A concrete `requested` type is decoded strictly;
/// [`ResponseType::Auto`] is resolved from `content_type` first.
///
/// # Errors
///
/// Returns an error if the body has to be parsed as JSON and is not valid
/// JSON.
pub fn decode_body(
    raw: Option<&RawResponse>,
    text: Option<&str>,
    content_type: Option<&str>,
    requested: ResponseType,
) -> Result<ResponseData, DecodeError> {
    let resolved = requested.resolve(content_type);
    if resolved.is_binary() {
        return Ok(ResponseData::Binary(match (raw, text) {
            (Some(RawResponse::Bytes(bytes)), _) => bytes.clone(),
            (Some(RawResponse::Structured(value)), _) => Bytes::from(value.to_string()),
            (None, Some(text)) => Bytes::copy_from_slice(text.as_bytes()),
            (None, None) => Bytes::new(),
        }));
    }

    match resolved {
        ResponseType::Json => match (raw, text) {
            (Some(RawResponse::Structured(value)), _) => Ok(ResponseData::Json(value.clone())),
            (_, Some(text)) => serde_json::from_str(text)
                .map(ResponseData::Json)
                .context(DecodeSnafu),
            (Some(RawResponse::Bytes(bytes)), None) => serde_json::from_slice(bytes)
                .map(ResponseData::Json)
                .context(DecodeSnafu),
            (None, None) => serde_json::from_str("")
                .map(ResponseData::Json)
                .context(DecodeSnafu),
        },
        _ if requested == ResponseType::Auto => Ok(match (text, raw) {
            (Some(text), _) => ResponseData::Text(text.to_owned()),
            (None, Some(RawResponse::Bytes(bytes))) => ResponseData::Binary(bytes.clone()),
            (None, Some(RawResponse::Structured(value))) => ResponseData::Json(value.clone()),
            (None, None) => ResponseData::Text(String::new()),
        }),
        _ => Ok(ResponseData::Text(match (text, raw) {
            (Some(text), _) => text.to_owned(),
            (None, Some(RawResponse::Bytes(bytes))) => String::from_utf8_lossy(bytes).into_owned(),
            (None, Some(RawResponse::Structured(value))) => value.to_string(),
            (None, None) => String::new(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bytes(data: &'static [u8]) -> RawResponse {
        RawResponse::Bytes(Bytes::from_static(data))
    }

    #[test]
    fn test_auto_resolution() {
        assert_eq!(
            ResponseType::Auto.resolve(Some("application/octet-stream")),
            ResponseType::binary()
        );
        assert_eq!(
            ResponseType::Auto.resolve(Some("application/json; charset=utf-8")),
            ResponseType::Json
        );
        assert_eq!(
            ResponseType::Auto.resolve(Some("text/html")),
            ResponseType::Text
        );
        assert_eq!(ResponseType::Auto.resolve(None), ResponseType::Text);
        assert_eq!(
            ResponseType::Text.resolve(Some("application/json")),
            ResponseType::Text
        );
    }

    #[test]
    fn test_auto_binary_is_bytes() {
        let raw = bytes(&[1, 2, 3]);
        let decoded = decode_body(
            Some(&raw),
            None,
            Some("application/octet-stream"),
            ResponseType::Auto,
        )
        .unwrap();
        assert_eq!(decoded, ResponseData::Binary(Bytes::from_static(&[1, 2, 3])));
    }

    #[test]
    fn test_auto_json_is_parsed() {
        let raw = bytes(br#"{"value":42}"#);
        let decoded = decode_body(
            Some(&raw),
            Some(r#"{"value":42}"#),
            Some("application/json"),
            ResponseType::Auto,
        )
        .unwrap();
        assert_eq!(decoded, ResponseData::Json(json!({"value": 42})));
    }

    #[test]
    fn test_auto_malformed_json_is_an_error() {
        let raw = bytes(b"{not json");
        let result = decode_body(
            Some(&raw),
            Some("{not json"),
            Some("application/json"),
            ResponseType::Auto,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_auto_other_is_text() {
        let raw = bytes(b"<p>hi</p>");
        let decoded = decode_body(
            Some(&raw),
            Some("<p>hi</p>"),
            Some("text/html"),
            ResponseType::Auto,
        )
        .unwrap();
        assert_eq!(decoded, ResponseData::Text("<p>hi</p>".to_owned()));
    }

    #[test]
    fn test_auto_falls_back_to_raw_without_text() {
        let raw = bytes(&[0xff, 0x00]);
        let decoded = decode_body(Some(&raw), None, None, ResponseType::Auto).unwrap();
        assert_eq!(decoded, ResponseData::Binary(Bytes::from_static(&[0xff, 0x00])));
    }

    #[test]
    fn test_explicit_json_passes_structured_through() {
        let raw = RawResponse::Structured(json!({"already": "parsed"}));
        let decoded =
            decode_body(Some(&raw), Some("ignored"), Some("text/plain"), ResponseType::Json)
                .unwrap();
        assert_eq!(decoded, ResponseData::Json(json!({"already": "parsed"})));
    }

    #[test]
    fn test_explicit_types_ignore_content_type() {
        let raw = bytes(br#"{"a":1}"#);
        let text = r#"{"a":1}"#;
        let ct = Some("application/json");

        let decoded = decode_body(Some(&raw), Some(text), ct, ResponseType::Text).unwrap();
        assert_eq!(decoded, ResponseData::Text(text.to_owned()));

        for rt in [ResponseType::Buffer, ResponseType::ArrayBuffer] {
            let decoded = decode_body(Some(&raw), Some(text), ct, rt).unwrap();
            assert_eq!(decoded, ResponseData::Binary(Bytes::from_static(br#"{"a":1}"#)));
        }

        let decoded =
            decode_body(Some(&raw), Some(text), Some("text/plain"), ResponseType::Json).unwrap();
        assert_eq!(decoded, ResponseData::Json(json!({"a": 1})));
    }

    #[test]
    fn test_parse_response_type() {
        assert_eq!("arraybuffer".parse::<ResponseType>().unwrap(), ResponseType::ArrayBuffer);
        assert_eq!("JSON".parse::<ResponseType>().unwrap(), ResponseType::Json);
        assert!("blob".parse::<ResponseType>().is_err());
        assert_eq!(ResponseType::Buffer.to_string(), "buffer");
    }

    #[test]
    fn test_typed_json_access() {
        #[derive(Deserialize)]
        struct Value42 {
            value: u32,
        }
        let data = ResponseData::Json(json!({"value": 42}));
        assert_eq!(data.json::<Value42>().unwrap().value, 42);
        assert!(ResponseData::Text("nope".into()).json::<Value42>().is_err());
    }
}
