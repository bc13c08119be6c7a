//! The [`RequestError`] returned when a request does not succeed.
//!
//! Every error is built in one step from a snafu context selector and is not
//! changed afterwards. [`RequestError::code`] gives the stable machine-readable
//! classification; the [`Display`](std::fmt::Display) output is the
//! human-readable message.

use std::fmt::Write as _;

use http::Method;
use serde::Serialize;
use snafu::Snafu;

use crate::{
    body::{DecodeError, ResponseData},
    headers::{EMPTY_HEADERS, Headers},
    request_url::QueryEncodeError,
};

const BODY_EXCERPT_CHARS: usize = 512;

/// Machine-readable classification of a [`RequestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request was cancelled before it completed.
    Aborted,
    /// The request could not be made or its response could not be used.
    RequestFailed,
    /// A response arrived but its status was rejected.
    StatusInvalid,
}

impl ErrorCode {
    /// Returns the code as an upper-case identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aborted => "ABORTED",
            Self::RequestFailed => "REQUEST_FAILED",
            Self::StatusInvalid => "STATUS_INVALID",
        }
    }
}

/// Whatever the transport captured about a failed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailedResponse {
    /// The status code, or `0` if no response arrived.
    pub status_code: u16,
    /// The status text, or empty if no response arrived.
    pub status_text: String,
    /// The response headers with lower-cased keys.
    pub headers: Headers,
    /// The decoded response body. Never set for JSON responses.
    pub body: Option<ResponseData>,
}

/// An error returned by [`request`](crate::request).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RequestError {
    /// No URL was provided.
    #[snafu(display("Request failed: no URL was provided"))]
    MissingUrl,
    /// The query parameters could not be appended to the URL.
    #[snafu(display("Request failed: could not build the URL for {url}"))]
    InvalidQuery {
        /// The URL before the query was appended.
        url: String,
        /// The underlying error.
        source: QueryEncodeError,
    },
    /// The transport aborted the request.
    #[snafu(display("Request failed: The request was aborted"))]
    Aborted {
        /// The request method.
        method: Method,
        /// The request URL.
        url: String,
    },
    /// The transport reported a network-level failure.
    #[snafu(display("{}", describe_failure(method, url, response, cause.as_deref())))]
    RequestFailed {
        /// The request method.
        method: Method,
        /// The request URL.
        url: String,
        /// What was captured of the response, if anything.
        response: FailedResponse,
        /// The transport's account of the failure, if it gave one.
        cause: Option<String>,
    },
    /// The response status was rejected by the status validator.
    #[snafu(display("{}", describe_failure(method, url, response, None)))]
    StatusInvalid {
        /// The request method.
        method: Method,
        /// The request URL.
        url: String,
        /// The rejected response.
        response: FailedResponse,
    },
    /// The response body could not be decoded.
    #[snafu(display(
        "Request failed: {method} {url}: {} {}: malformed response body",
        response.status_code,
        response.status_text
    ))]
    MalformedBody {
        /// The request method.
        method: Method,
        /// The request URL.
        url: String,
        /// The response, without a body.
        response: FailedResponse,
        /// The underlying error.
        source: DecodeError,
    },
}

impl RequestError {
    /// Returns the machine-readable classification of this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Aborted { .. } => ErrorCode::Aborted,
            Self::StatusInvalid { .. } => ErrorCode::StatusInvalid,
            Self::MissingUrl
            | Self::InvalidQuery { .. }
            | Self::RequestFailed { .. }
            | Self::MalformedBody { .. } => ErrorCode::RequestFailed,
        }
    }

    fn response(&self) -> Option<&FailedResponse> {
        match self {
            Self::RequestFailed { response, .. }
            | Self::StatusInvalid { response, .. }
            | Self::MalformedBody { response, .. } => Some(response),
            Self::MissingUrl | Self::InvalidQuery { .. } | Self::Aborted { .. } => None,
        }
    }

    /// Returns the response status code, or `0` if there was no response.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.response().map_or(0, |r| r.status_code)
    }

    /// Returns the response status text, or an empty string if there was no
    /// response.
    #[must_use]
    pub fn status_text(&self) -> &str {
        self.response().map_or("", |r| r.status_text.as_str())
    }

    /// Returns the response headers. Empty if there was no response.
    #[must_use]
    pub fn response_headers(&self) -> &Headers {
        self.response().map_or(&EMPTY_HEADERS, |r| &r.headers)
    }

    /// Returns the decoded response body, if one was attached.
    #[must_use]
    pub fn response_body(&self) -> Option<&ResponseData> {
        self.response().and_then(|r| r.body.as_ref())
    }

    /// Returns the transport's description of a network-level failure.
    #[must_use]
    pub fn failure_cause(&self) -> Option<&str> {
        match self {
            Self::RequestFailed { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }
}

fn describe_failure(
    method: &Method,
    url: &str,
    response: &FailedResponse,
    cause: Option<&str>,
) -> String {
    let mut message = format!("Request failed: {method} {url}");
    if response.status_code != 0 {
        let status = format!(": {} {}", response.status_code, response.status_text);
        message.push_str(status.trim_end());
    }
    let excerpt = match &response.body {
        Some(ResponseData::Text(text)) if !text.is_empty() => Some(text.as_str()),
        _ => None,
    };
    if let Some(excerpt) = excerpt {
        message.push_str(": ");
        message.extend(excerpt.chars().take(BODY_EXCERPT_CHARS));
        if excerpt.chars().nth(BODY_EXCERPT_CHARS).is_some() {
            message.push_str("...");
        }
    } else if let Some(ResponseData::Binary(bytes)) = &response.body {
        let _ = write!(message, ": <{} bytes>", bytes.len());
    }
    if let Some(cause) = cause {
        let _ = write!(message, " ({cause})");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forbidden(body: Option<ResponseData>) -> FailedResponse {
        FailedResponse {
            status_code: 403,
            status_text: "Forbidden".to_owned(),
            headers: Headers::from([("content-type", "text/plain")]),
            body,
        }
    }

    #[test]
    fn test_status_invalid_message_includes_excerpt() {
        let err = RequestError::StatusInvalid {
            method: Method::GET,
            url: "http://host/private".to_owned(),
            response: forbidden(Some(ResponseData::Text("go away".to_owned()))),
        };
        assert_eq!(err.code(), ErrorCode::StatusInvalid);
        assert_eq!(
            err.to_string(),
            "Request failed: GET http://host/private: 403 Forbidden: go away"
        );
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.status_text(), "Forbidden");
        assert_eq!(err.response_headers().content_type(), Some("text/plain"));
    }

    #[test]
    fn test_message_without_body() {
        let err = RequestError::RequestFailed {
            method: Method::POST,
            url: "http://host/".to_owned(),
            response: forbidden(None),
            cause: None,
        };
        assert_eq!(err.code(), ErrorCode::RequestFailed);
        assert_eq!(err.to_string(), "Request failed: POST http://host/: 403 Forbidden");
        assert!(err.response_body().is_none());
        assert_eq!(err.failure_cause(), None);
    }

    #[test]
    fn test_message_carries_transport_cause() {
        let err = RequestError::RequestFailed {
            method: Method::GET,
            url: "http://host/x".to_owned(),
            response: FailedResponse::default(),
            cause: Some("Invalid value for header x-bad".to_owned()),
        };
        assert_eq!(
            err.to_string(),
            "Request failed: GET http://host/x (Invalid value for header x-bad)"
        );
        assert_eq!(err.failure_cause(), Some("Invalid value for header x-bad"));
    }

    #[test]
    fn test_long_excerpt_is_truncated() {
        let err = RequestError::StatusInvalid {
            method: Method::GET,
            url: "http://host/".to_owned(),
            response: forbidden(Some(ResponseData::Text("x".repeat(2000)))),
        };
        let message = err.to_string();
        assert!(message.ends_with("..."));
        assert!(message.len() < 600);
    }

    #[test]
    fn test_aborted_has_no_response() {
        let err = RequestError::Aborted {
            method: Method::GET,
            url: "http://host/".to_owned(),
        };
        assert_eq!(err.code(), ErrorCode::Aborted);
        assert_eq!(err.status_code(), 0);
        assert_eq!(err.status_text(), "");
        assert!(err.response_headers().is_empty());
        assert!(err.response_body().is_none());
        assert_eq!(err.to_string(), "Request failed: The request was aborted");
    }

    #[test]
    fn test_code_names() {
        assert_eq!(ErrorCode::Aborted.as_str(), "ABORTED");
        assert_eq!(ErrorCode::RequestFailed.as_str(), "REQUEST_FAILED");
        assert_eq!(ErrorCode::StatusInvalid.as_str(), "STATUS_INVALID");
        assert_eq!(
            serde_json::to_string(&ErrorCode::StatusInvalid).unwrap(),
            "\"STATUS_INVALID\""
        );
    }
}
