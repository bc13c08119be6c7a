//! A single `request()` function that behaves the same on native and browser
//! targets.
//!
//! The pipeline composes the URL and query, normalizes headers, serializes the
//! body, hands the request to a [`Transport`](transport::Transport), and
//! decodes the response by its content type unless a
//! [`ResponseType`](body::ResponseType) was requested.

#![forbid(unsafe_code)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod body;
mod error;
pub mod headers;
mod options;
pub mod platform;
mod request;
pub mod request_url;
pub mod status;
pub mod transport;

pub use body::{RequestBody, ResponseData, ResponseType};
pub use error::{ErrorCode, FailedResponse, RequestError};
pub use headers::Headers;
pub use options::{RequestOptions, StatusValidator};
pub use request::{Response, request_with};
pub use request_url::Query;

#[cfg(feature = "transport-reqwest-0_13")]
pub use request::request;

/// Documentation
pub mod _documentation {
    #[doc = include_str!("../README.md")]
    mod readme {}
    #[doc = include_str!("../CHANGELOG.md")]
    pub mod changelog {}
}

pub use bytes::Bytes;
pub use http::Method;
