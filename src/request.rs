//! The request pipeline.
//!
//! [`request_with`] runs one request from start to finish: it composes the URL,
//! normalizes headers, encodes the body, drives a fresh transport, and turns
//! the transport's single terminal event into a [`Response`] or a
//! [`RequestError`].

use http::Method;
use snafu::prelude::*;

use crate::{
    body::{
        Payload, ResponseData, ResponseType, decode_body, encode_body, is_json_content_type,
        prepare_headers,
    },
    error::{
        AbortedSnafu, FailedResponse, InvalidQuerySnafu, MalformedBodySnafu, MissingUrlSnafu,
        RequestError, RequestFailedSnafu, StatusInvalidSnafu,
    },
    headers::{Headers, parse_headers},
    options::RequestOptions,
    platform::IS_BROWSER,
    request_url::compose_url,
    status::status_text,
    transport::{Transport, TransportEvent, TransportFactory},
};

/// A settled, successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The final URL, after redirects if the transport reports them.
    pub url: String,
    /// The request method.
    pub method: Method,
    /// The response headers with lower-cased keys.
    pub headers: Headers,
    /// The response status code.
    pub status_code: u16,
    /// The reason phrase for the status code. Empty for unregistered codes.
    pub status_text: String,
    /// The decoded body.
    pub data: ResponseData,
}

/// Makes a request using the default transport for this platform.
///
/// Accepts either full [`RequestOptions`] or a URL to `GET`.
///
/// # Errors
///
/// Returns a [`RequestError`] if the request is aborted, fails at the network
/// level, is answered with a status rejected by the status validator, or
/// returns a body which cannot be decoded as requested.
#[cfg(feature = "transport-reqwest-0_13")]
pub async fn request(options: impl Into<RequestOptions>) -> Result<Response, RequestError> {
    request_with(&crate::transport::DefaultTransportFactory, options).await
}

/// Makes a request using a transport created by `factory`.
///
/// # Errors
///
/// See [`request`].
pub async fn request_with<F: TransportFactory>(
    factory: &F,
    options: impl Into<RequestOptions>,
) -> Result<Response, RequestError> {
    let prepared = PreparedRequest::build(options.into())?;
    let transport = factory.create();
    prepared.dispatch(transport).await
}

/// A request whose URL, headers and body are final, ready to hand to a
/// transport.
struct PreparedRequest {
    options: RequestOptions,
    url: String,
    headers: Headers,
    payload: Option<Payload>,
}

impl PreparedRequest {
    fn build(mut options: RequestOptions) -> Result<Self, RequestError> {
        ensure!(!options.url.is_empty(), MissingUrlSnafu);

        let url = compose_url(&options.url, options.query.as_ref()).context(InvalidQuerySnafu {
            url: options.url.as_str(),
        })?;

        let mut headers = options.headers.clone();
        prepare_headers(options.body.as_ref(), &mut headers);
        let payload = encode_body(options.body.take(), &headers);

        Ok(Self {
            options,
            url,
            headers,
            payload,
        })
    }

    async fn dispatch<T: Transport>(self, mut transport: T) -> Result<Response, RequestError> {
        let Self {
            options,
            url,
            headers,
            payload,
        } = self;

        transport.open(&options.method, &url);
        if let Some(with_credentials) = options.with_credentials {
            transport.set_with_credentials(with_credentials);
        }
        if let Some(transport_options) = &options.transport_options {
            transport.apply_options(transport_options);
        }
        for (name, value) in headers.iter() {
            tracing::trace!(name, value, "Setting request header");
            transport.set_request_header(name, value);
        }
        match options.response_type {
            ResponseType::Auto => {}
            ResponseType::Buffer if IS_BROWSER => {
                transport.set_response_type(ResponseType::ArrayBuffer);
            }
            response_type => transport.set_response_type(response_type),
        }

        tracing::debug!(
            method = %options.method,
            url = %url,
            has_body = payload.is_some(),
            response_type = %options.response_type,
            "Sending request"
        );
        let event = transport.send(payload).await;
        tracing::debug!(
            method = %options.method,
            url = %url,
            ?event,
            status = transport.status(),
            "Request settled"
        );

        match event {
            TransportEvent::Load => on_load(&transport, &options, url),
            TransportEvent::Error => RequestFailedSnafu {
                method: options.method.clone(),
                url,
                response: failed_response(&transport, options.response_type),
                cause: transport.failure_cause(),
            }
            .fail(),
            TransportEvent::Abort => AbortedSnafu {
                method: options.method.clone(),
                url,
            }
            .fail(),
        }
    }
}

fn on_load<T: Transport>(
    transport: &T,
    options: &RequestOptions,
    url: String,
) -> Result<Response, RequestError> {
    let status_code = transport.status();
    let validator = options.validate_status.clone().unwrap_or_default();
    if !validator.validate(status_code) {
        return StatusInvalidSnafu {
            method: options.method.clone(),
            url,
            response: failed_response(transport, options.response_type),
        }
        .fail();
    }

    let headers = parse_headers(&transport.get_all_response_headers());
    let data = decode_body(
        transport.response().as_ref(),
        transport.response_text().as_deref(),
        headers.content_type(),
        options.response_type,
    )
    .with_context(|_| MalformedBodySnafu {
        method: options.method.clone(),
        url: url.as_str(),
        response: FailedResponse {
            status_code,
            status_text: status_text(status_code).to_owned(),
            headers: headers.clone(),
            body: None,
        },
    })?;

    Ok(Response {
        url: transport
            .response_url()
            .filter(|u| !u.is_empty())
            .unwrap_or(url),
        method: options.method.clone(),
        headers,
        status_code,
        status_text: status_text(status_code).to_owned(),
        data,
    })
}

/// Captures what the transport has of a failed response.
///
/// The body is only attached when neither the response nor the caller's
/// requested type is JSON, so error handling never parses JSON it cannot
/// trust. Bodies that cannot be decoded are left off.
fn failed_response<T: Transport>(transport: &T, response_type: ResponseType) -> FailedResponse {
    let status_code = transport.status();
    let reason = match transport.status_text() {
        text if text.is_empty() => status_text(status_code).to_owned(),
        text => text,
    };
    let headers = parse_headers(&transport.get_all_response_headers());
    let content_type = transport.get_response_header("content-type");

    let is_json = response_type == ResponseType::Json
        || content_type.as_deref().is_some_and(is_json_content_type);
    let raw = transport.response();
    let body = if is_json || raw.is_none() {
        None
    } else {
        decode_body(
            raw.as_ref(),
            transport.response_text().as_deref(),
            content_type.as_deref(),
            response_type,
        )
        .ok()
    };

    FailedResponse {
        status_code,
        status_text: reason,
        headers,
        body,
    }
}
