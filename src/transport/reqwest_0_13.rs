use std::borrow::Cow;
use std::sync::LazyLock;

use bytes::Bytes;
use futures_util::future::{AbortHandle, AbortRegistration, Abortable};
use http::{
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    header::{CONTENT_TYPE, InvalidHeaderName, InvalidHeaderValue},
};
use snafu::prelude::*;

use super::{Transport, TransportEvent, TransportFactory, TransportOptions};
use crate::body::{FormData, Payload, RawResponse, ResponseType};

static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(reqwest::Client::new);

/// Creates a [`ReqwestTransport`] per request, sharing one `reqwest::Client`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    type Transport = ReqwestTransport;

    fn create(&self) -> ReqwestTransport {
        tracing::trace!(
            browser = crate::platform::IS_BROWSER,
            "Creating reqwest transport"
        );
        ReqwestTransport::new(SHARED_CLIENT.clone())
    }
}

#[derive(Debug, Snafu)]
enum BuildError {
    #[snafu(display("Transport was sent before it was opened"))]
    NotOpened,
    #[snafu(display("Transport was already sent"))]
    AlreadySent,
    #[snafu(display("Invalid header name: {name}"))]
    InvalidName {
        name: String,
        source: InvalidHeaderName,
    },
    #[snafu(display("Invalid value for header {name}"))]
    InvalidValue {
        name: String,
        source: InvalidHeaderValue,
    },
    #[snafu(display("Failed to encode form body"))]
    Form { source: serde_html_form::ser::Error },
    #[snafu(display("Failed to build request"))]
    Build { source: reqwest::Error },
}

#[derive(Debug)]
struct Received {
    status: StatusCode,
    url: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Received {
    fn from_response(response: &reqwest::Response) -> Self {
        Self {
            status: response.status(),
            url: response.url().to_string(),
            headers: response.headers().clone(),
            body: None,
        }
    }
}

/// A [`Transport`] backed by `reqwest`.
///
/// The response body is buffered in full before [`Transport::send`] resolves.
/// On native targets the pass-through option `timeout_ms` sets a per-request
/// timeout; on browser targets `with_credentials` includes fetch credentials.
#[derive(Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    method: Method,
    url: Option<String>,
    headers: Vec<(String, String)>,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    with_credentials: bool,
    response_type: ResponseType,
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    timeout_ms: Option<u64>,
    abort_handle: AbortHandle,
    abort_registration: Option<AbortRegistration>,
    received: Option<Received>,
    failure: Option<String>,
}

impl ReqwestTransport {
    /// Creates a transport which sends through `client`.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        Self {
            client,
            method: Method::GET,
            url: None,
            headers: Vec::new(),
            with_credentials: false,
            response_type: ResponseType::Auto,
            timeout_ms: None,
            abort_handle,
            abort_registration: Some(abort_registration),
            received: None,
            failure: None,
        }
    }

    /// Returns a handle which aborts this transport's exchange from elsewhere.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    fn build_request(
        &self,
        url: &str,
        body: Option<Payload>,
    ) -> Result<reqwest::Request, BuildError> {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).context(InvalidNameSnafu { name })?;
            let header_value = HeaderValue::from_str(value).context(InvalidValueSnafu { name })?;
            headers.insert(header_name, header_value);
        }

        let body = match body {
            None => None,
            Some(Payload::Text(text)) => Some(Bytes::from(text)),
            Some(Payload::Binary(bytes)) => Some(bytes),
            Some(Payload::Form(form)) => Some(encode_form(&form, &mut headers)?),
        };

        let mut builder = self
            .client
            .request(self.method.clone(), url)
            .headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        builder = self.apply_platform_options(builder);
        builder.build().context(BuildSnafu)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn apply_platform_options(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.timeout_ms {
            Some(ms) => builder.timeout(std::time::Duration::from_millis(ms)),
            None => builder,
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn apply_platform_options(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.with_credentials {
            builder.fetch_credentials_include()
        } else {
            builder
        }
    }

    fn text_available(&self) -> bool {
        !matches!(
            self.response_type,
            ResponseType::Buffer | ResponseType::ArrayBuffer
        )
    }
}

/// Joins an error with its sources, outermost first.
fn describe_chain(error: &(dyn std::error::Error + 'static)) -> String {
    snafu::ChainCompat::new(error)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

/// Renders a header value, replacing bytes that are not UTF-8.
fn lossy_value(value: &HeaderValue) -> Cow<'_, str> {
    String::from_utf8_lossy(value.as_bytes())
}

fn encode_form(form: &FormData, headers: &mut HeaderMap) -> Result<Bytes, BuildError> {
    let encoded = serde_html_form::to_string(form).context(FormSnafu)?;
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
    }
    Ok(Bytes::from(encoded))
}

impl Transport for ReqwestTransport {
    fn open(&mut self, method: &Method, url: &str) {
        self.method = method.clone();
        self.url = Some(url.to_owned());
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    fn set_with_credentials(&mut self, with_credentials: bool) {
        self.with_credentials = with_credentials;
    }

    fn set_response_type(&mut self, response_type: ResponseType) {
        self.response_type = response_type;
    }

    fn apply_options(&mut self, options: &TransportOptions) {
        if let Some(ms) = options.get("timeout_ms").and_then(serde_json::Value::as_u64) {
            self.timeout_ms = Some(ms);
        }
    }

    async fn send(&mut self, body: Option<Payload>) -> TransportEvent {
        let prepared = self
            .url
            .as_deref()
            .context(NotOpenedSnafu)
            .and_then(|url| self.build_request(url, body))
            .and_then(|request| {
                let registration = self.abort_registration.take().context(AlreadySentSnafu)?;
                Ok((request, registration))
            });
        let (request, registration) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => {
                tracing::debug!(%error, "Failed to prepare request");
                self.failure = Some(describe_chain(&error));
                return TransportEvent::Error;
            }
        };

        let client = self.client.clone();
        let exchange = async move {
            let response = match client.execute(request).await {
                Ok(response) => response,
                Err(error) => return Err((None, error)),
            };
            let mut received = Received::from_response(&response);
            match response.bytes().await {
                Ok(bytes) => {
                    received.body = Some(bytes);
                    Ok(received)
                }
                Err(error) => Err((Some(received), error)),
            }
        };

        match Abortable::new(exchange, registration).await {
            Ok(Ok(received)) => {
                self.received = Some(received);
                TransportEvent::Load
            }
            Ok(Err((received, error))) => {
                tracing::debug!(%error, "HTTP exchange failed");
                self.failure = Some(describe_chain(&error));
                self.received = received;
                TransportEvent::Error
            }
            Err(_aborted) => TransportEvent::Abort,
        }
    }

    fn abort(&self) {
        self.abort_handle.abort();
    }

    fn status(&self) -> u16 {
        self.received.as_ref().map_or(0, |r| r.status.as_u16())
    }

    fn status_text(&self) -> String {
        self.received
            .as_ref()
            .and_then(|r| r.status.canonical_reason())
            .unwrap_or_default()
            .to_owned()
    }

    fn response(&self) -> Option<RawResponse> {
        self.received
            .as_ref()
            .and_then(|r| r.body.clone())
            .map(RawResponse::Bytes)
    }

    fn response_text(&self) -> Option<String> {
        if !self.text_available() {
            return None;
        }
        self.received
            .as_ref()
            .and_then(|r| r.body.as_ref())
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }

    fn response_url(&self) -> Option<String> {
        self.received.as_ref().map(|r| r.url.clone())
    }

    fn get_all_response_headers(&self) -> String {
        let Some(received) = &self.received else {
            return String::new();
        };
        received
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {}\r\n", lossy_value(value)))
            .collect()
    }

    fn failure_cause(&self) -> Option<String> {
        self.failure.clone()
    }

    fn get_response_header(&self, name: &str) -> Option<String> {
        let received = self.received.as_ref()?;
        let values: Vec<Cow<'_, str>> = received
            .headers
            .get_all(name)
            .iter()
            .map(lossy_value)
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn received_with(name: &'static str, value: &'static [u8]) -> Received {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.append(
            HeaderName::from_static(name),
            HeaderValue::from_bytes(value).unwrap(),
        );
        Received {
            status: StatusCode::OK,
            url: "http://host/".to_owned(),
            headers,
            body: Some(Bytes::from_static(b"ok")),
        }
    }

    #[test]
    fn test_non_ascii_header_values_are_kept() {
        let mut transport = ReqwestTransport::new(reqwest::Client::new());
        transport.received = Some(received_with("x-name", b"caf\xe9"));

        let block = transport.get_all_response_headers();
        let headers = crate::headers::parse_headers(&block);
        assert_eq!(headers.get("x-name"), Some("caf\u{fffd}"));
        assert_eq!(
            headers.content_type(),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(
            transport.get_response_header("X-Name").as_deref(),
            Some("caf\u{fffd}")
        );
    }

    #[test]
    fn test_repeated_header_values_are_joined() {
        let mut received = received_with("x-tag", b"one");
        received.headers.append(
            HeaderName::from_static("x-tag"),
            HeaderValue::from_bytes(b"t\xfcwo").unwrap(),
        );
        let mut transport = ReqwestTransport::new(reqwest::Client::new());
        transport.received = Some(received);

        assert_eq!(
            transport.get_response_header("x-tag").as_deref(),
            Some("one, t\u{fffd}wo")
        );
    }

    #[tokio::test]
    async fn test_invalid_header_value_reports_cause() {
        let mut transport = ReqwestTransport::new(reqwest::Client::new());
        transport.open(&Method::GET, "http://127.0.0.1:9/x");
        transport.set_request_header("x-bad", "line1\nline2");

        assert_eq!(transport.send(None).await, TransportEvent::Error);
        assert_eq!(transport.status(), 0);
        let cause = transport.failure_cause().unwrap();
        assert!(cause.contains("x-bad"), "{cause}");
    }

    #[tokio::test]
    async fn test_unopened_transport_reports_cause() {
        let mut transport = ReqwestTransport::new(reqwest::Client::new());
        assert_eq!(transport.send(None).await, TransportEvent::Error);
        assert!(transport.failure_cause().is_some());
    }
}
