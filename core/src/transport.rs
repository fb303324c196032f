//! The injection seam between the client and the network.
//!
//! # Design
//! The client never talks to a socket itself. It builds an [`HttpRequest`],
//! hands it to a [`Transport`], and interprets the [`HttpResponse`]. A
//! transport must return every status code as data; only faults that prevent
//! a response (DNS, refused connection, timeout, unreadable body) are errors.
//!
//! [`UreqTransport`] is the default. Tests inject stubs.

use std::fmt;
use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent is built with `http_status_as_error(false)` so 4xx/5xx
/// responses come back as `HttpResponse` values, and accepts any verb so
/// `HttpMethod::Other` reaches the server. Timeouts are configured here,
/// not on the client.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Fail any request that takes longer than `timeout` end to end.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .allow_non_standard_methods(true)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let result = match &request.body {
            Some(body) => {
                let http_request = builder.body(body.as_bytes()).map_err(TransportError::from_source)?;
                self.agent.run(http_request)
            }
            None => {
                let http_request = builder.body(()).map_err(TransportError::from_source)?;
                self.agent.run(http_request)
            }
        };
        let mut response = result.map_err(TransportError::from_source)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(TransportError::from_source)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
