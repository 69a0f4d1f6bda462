//! Blocking HTTP transport for Conduit calls.
//!
//! # Design
//! `Transport` is the only seam that touches the network: one `HttpRequest`
//! in, one `HttpResponse` out, no retries. HTTP status codes are returned as
//! data; only failures to complete the exchange become `TransportError`.
//! Tests swap in stubs that record or refuse calls.

use std::fmt;

use ureq::Agent;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Performs one POST round trip.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Default transport backed by a ureq agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_agent(
            Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent(),
        )
    }

    /// Use a preconfigured agent (proxies, TLS). The agent should have
    /// `http_status_as_error(false)` so error envelopes on 4xx/5xx replies
    /// reach the response parser.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        // Without a per-call timeout the agent's own timeouts apply.
        if let Some(timeout) = request.timeout {
            builder = builder.config().timeout_global(Some(timeout)).build();
        }
        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(TransportError::new)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();
        // The body reader is owned by `response` and released when it drops,
        // on the error path as well.
        // Search pages with attachments can exceed ureq's default 10 MiB cap.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(TransportError::new)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
