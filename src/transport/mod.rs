//! Transport capability and factories.
//!
//! This module defines the traits that decouple the request pipeline from any
//! specific HTTP implementation. A [`Transport`] performs one exchange: it is
//! opened, configured, sent, and then read. A [`TransportFactory`] hands out a
//! fresh transport for every request.
//!
//! With the `transport-reqwest-0_13` feature, [`ReqwestTransport`] and
//! [`DefaultTransportFactory`] provide an implementation backed by `reqwest`
//! that works on native and browser targets alike.

#[cfg(feature = "transport-reqwest-0_13")]
mod reqwest_0_13;

use http::Method;
use serde_json::{Map, Value};

use crate::{
    body::{Payload, RawResponse, ResponseType},
    platform::{MaybeSend, MaybeSendSync},
};

#[cfg(feature = "transport-reqwest-0_13")]
pub use reqwest_0_13::{DefaultTransportFactory, ReqwestTransport};

/// Options passed to the transport without interpretation by the core.
pub type TransportOptions = Map<String, Value>;

/// The terminal event of a sent request.
///
/// Exactly one event is produced per [`Transport::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// A response was received, whatever its status.
    Load,
    /// The exchange failed at the network level.
    Error,
    /// The exchange was aborted.
    Abort,
}

/// Defines the interface of a single HTTP exchange.
///
/// The response accessors are meaningful once [`Transport::send`] has
/// resolved. Before that, or when no response arrived, they return zero or
/// empty values.
pub trait Transport: MaybeSend {
    /// Sets the method and URL of the request.
    fn open(&mut self, method: &Method, url: &str);

    /// Adds a request header.
    fn set_request_header(&mut self, name: &str, value: &str);

    /// Sets whether credentials accompany cross-origin requests.
    fn set_with_credentials(&mut self, with_credentials: bool);

    /// Sets the concrete type the caller wants the response decoded as.
    fn set_response_type(&mut self, response_type: ResponseType);

    /// Applies transport-specific options. Unknown options are ignored.
    fn apply_options(&mut self, options: &TransportOptions);

    /// Sends the request, with a body if one is given, and resolves with the
    /// terminal event.
    fn send(&mut self, body: Option<Payload>) -> impl Future<Output = TransportEvent> + MaybeSend;

    /// Aborts the exchange. An in-flight [`Transport::send`] resolves with
    /// [`TransportEvent::Abort`].
    fn abort(&self);

    /// Returns the response status code, or `0` if there is none.
    fn status(&self) -> u16;

    /// Returns the response status text, or an empty string.
    fn status_text(&self) -> String;

    /// Returns the response body as received.
    fn response(&self) -> Option<RawResponse>;

    /// Returns the response body as text, if it is available as text.
    fn response_text(&self) -> Option<String>;

    /// Returns the final URL of the response, after any redirects.
    fn response_url(&self) -> Option<String>;

    /// Returns all response headers as a raw `name: value` block.
    fn get_all_response_headers(&self) -> String;

    /// Returns a single response header, ignoring case.
    fn get_response_header(&self, name: &str) -> Option<String>;

    /// Describes why the last exchange ended in [`TransportEvent::Error`].
    fn failure_cause(&self) -> Option<String> {
        None
    }
}

/// Creates a fresh [`Transport`] for each request.
///
/// Any `Fn() -> T` where `T: Transport` is a factory.
pub trait TransportFactory: MaybeSendSync {
    /// The transport type this factory creates.
    type Transport: Transport;

    /// Creates a new, unopened transport.
    fn create(&self) -> Self::Transport;
}

impl<T: Transport, F: Fn() -> T + MaybeSendSync> TransportFactory for F {
    type Transport = T;

    fn create(&self) -> T {
        self()
    }
}
