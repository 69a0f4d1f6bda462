//! HTTP values exchanged between the client and its transport.
//!
//! # Design
//! Requests and responses are plain data. The envelope builder produces an
//! `HttpRequest` without touching the network, a `Transport` turns it into
//! an `HttpResponse`, and the response parser consumes that. Hosts that do
//! their own I/O can stop after the build step and resume at the parse step.
//!
//! Every Conduit call is a POST, so the request carries no method field.
//! Per-call transport settings (the timeout) ride on the request itself
//! rather than on shared transport state.

use std::time::Duration;

/// A fully addressed Conduit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Form-encoded body: `output=json&params=<json>`.
    pub body: String,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// The raw reply to an `HttpRequest`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// A 200 response with the given body and no headers.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}
