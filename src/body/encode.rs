use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use super::{CONTENT_TYPE_JSON, is_json_content_type};
use crate::headers::Headers;

/// A body to send with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent verbatim, whatever the content type.
    Text(String),
    /// Sent verbatim. The content type is never forced to JSON.
    Binary(Bytes),
    /// A structured value, serialized to JSON.
    Json(Value),
    /// Form fields, encoded by the transport.
    Form(FormData),
}

impl RequestBody {
    /// Serializes `value` into a [`RequestBody::Json`].
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }

    /// Whether this body goes out as JSON given the declared `content_type`.
    ///
    /// Both [`prepare_headers`] and [`encode_body`] use this, so the header
    /// decision and the serialization decision always agree.
    fn is_json(&self, content_type: Option<&str>) -> bool {
        match self {
            Self::Json(_) => content_type.is_none_or(is_json_content_type),
            Self::Text(_) | Self::Binary(_) | Self::Form(_) => false,
        }
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Bytes> for RequestBody {
    fn from(value: Bytes) -> Self {
        Self::Binary(value)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value.into())
    }
}

impl From<&'static [u8]> for RequestBody {
    fn from(value: &'static [u8]) -> Self {
        Self::Binary(Bytes::from_static(value))
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<FormData> for RequestBody {
    fn from(value: FormData) -> Self {
        Self::Form(value)
    }
}

/// Ordered form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    /// Creates an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    /// Iterates over the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A body in the form a transport sends it.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A text body.
    Text(String),
    /// A binary body.
    Binary(Bytes),
    /// Form fields for the transport to encode.
    Form(FormData),
}

/// Sets `content-type: application/json` when `body` is a structured value
/// and no content type has been set yet.
pub fn prepare_headers(body: Option<&RequestBody>, headers: &mut Headers) {
    if let Some(body) = body
        && headers.content_type().is_none()
        && body.is_json(None)
    {
        headers.set("content-type", CONTENT_TYPE_JSON);
    }
}

/// Converts `body` into the payload handed to the transport.
///
/// Text and binary bodies pass through untouched. A structured value is
/// serialized to JSON, with `null` sent as `{}` when the content type is JSON.
/// Returns `None` when there is no body, in which case nothing is sent.
#[must_use]
pub fn encode_body(body: Option<RequestBody>, headers: &Headers) -> Option<Payload> {
    let payload = match body? {
        RequestBody::Text(text) => Payload::Text(text),
        RequestBody::Binary(bytes) => Payload::Binary(bytes),
        RequestBody::Form(form) => Payload::Form(form),
        body @ RequestBody::Json(Value::Null) if body.is_json(headers.content_type()) => {
            Payload::Text("{}".to_owned())
        }
        // A structured value under a non-JSON content type is still serialized;
        // only the header stays as the caller set it.
        RequestBody::Json(value) => Payload::Text(value.to_string()),
    };
    Some(payload)
}
