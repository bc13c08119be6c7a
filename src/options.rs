//! Request options and their defaults.
//!
//! [`RequestOptions`] is built with [`RequestOptions::builder`]. Every option
//! other than the URL has a default, applied when the setter is not called:
//!
//! | option              | default                                      |
//! |---------------------|----------------------------------------------|
//! | `method`            | `GET`                                        |
//! | `headers`           | empty                                        |
//! | `query`             | none                                         |
//! | `body`              | none, so no body is sent                     |
//! | `response_type`     | [`ResponseType::Auto`]                       |
//! | `validate_status`   | accepts `200..400`                           |
//! | `with_credentials`  | unset, so the transport default applies      |
//! | `transport_options` | none                                         |

use std::fmt;
use std::sync::Arc;

use bon::Builder;
use http::Method;

use crate::{
    body::{RequestBody, ResponseType},
    headers::Headers,
    platform::MaybeSendSync,
    request_url::Query,
    transport::TransportOptions,
};

/// Decides whether a response status counts as success.
#[derive(Clone)]
pub struct StatusValidator(Arc<dyn StatusFn>);

trait StatusFn: Fn(u16) -> bool + MaybeSendSync {}
impl<F: Fn(u16) -> bool + MaybeSendSync> StatusFn for F {}

impl StatusValidator {
    /// Wraps a validation function.
    pub fn new(validate: impl Fn(u16) -> bool + MaybeSendSync + 'static) -> Self {
        Self(Arc::new(validate))
    }

    /// Returns `true` if `status` is acceptable.
    #[must_use]
    pub fn validate(&self, status: u16) -> bool {
        (self.0)(status)
    }
}

/// Accepts `200..400`.
impl Default for StatusValidator {
    fn default() -> Self {
        Self::new(|status| (200..400).contains(&status))
    }
}

impl fmt::Debug for StatusValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusValidator").finish_non_exhaustive()
    }
}

/// The options for a single request.
///
/// A `&str` or `String` converts into options for a `GET` of that URL.
#[derive(Debug, Clone, Builder)]
pub struct RequestOptions {
    /// The URL to request.
    #[builder(start_fn, into)]
    pub url: String,
    /// The request method.
    #[builder(default = Method::GET)]
    pub method: Method,
    /// The request headers. Keys are case-insensitive.
    #[builder(default, into)]
    pub headers: Headers,
    /// Query parameters appended to the URL.
    #[builder(into)]
    pub query: Option<Query>,
    /// The request body.
    #[builder(into)]
    pub body: Option<RequestBody>,
    /// How to decode the response body.
    #[builder(default)]
    pub response_type: ResponseType,
    /// Decides which response statuses are treated as success.
    #[builder(with = |validate: impl Fn(u16) -> bool + MaybeSendSync + 'static| StatusValidator::new(validate))]
    pub validate_status: Option<StatusValidator>,
    /// Whether credentials accompany cross-origin requests.
    pub with_credentials: Option<bool>,
    /// Options handed to the transport as-is.
    pub transport_options: Option<TransportOptions>,
}

impl From<&str> for RequestOptions {
    fn from(url: &str) -> Self {
        Self::builder(url).build()
    }
}

impl From<String> for RequestOptions {
    fn from(url: String) -> Self {
        Self::builder(url).build()
    }
}

impl From<&String> for RequestOptions {
    fn from(url: &String) -> Self {
        Self::builder(url.as_str()).build()
    }
}
