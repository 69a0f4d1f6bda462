//! The Conduit client: envelope building, one round trip, outcome parsing.
//!
//! # Design
//! `ConduitClient` owns an `EndpointConfig` and a `Transport`. Every call
//! snapshots the configuration, builds a fresh request envelope from it,
//! hands the request to the transport once, and parses the reply. There is
//! no other state, so concurrent calls do not interfere with each other.
//!
//! The configuration sits behind a lock so the embedding application can
//! rotate the token between calls. Calls already in flight keep the
//! snapshot they took.
//!
//! `build_call` and `parse_call` expose the two pure halves for hosts that
//! run the HTTP exchange themselves.

use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use crate::config::EndpointConfig;
use crate::edit::{edit_method, EditRequest};
use crate::envelope::{build_request, parse_response, Params};
use crate::error::ConduitError;
use crate::http::{HttpRequest, HttpResponse};
use crate::search::{search_method, SearchQuery};
use crate::transport::{Transport, UreqTransport};

/// Synchronous client for a Conduit API.
#[derive(Debug)]
pub struct ConduitClient<T = UreqTransport> {
    config: RwLock<EndpointConfig>,
    transport: T,
}

impl ConduitClient<UreqTransport> {
    pub fn new(config: EndpointConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }

    /// Client configured from `CONDUIT_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(EndpointConfig::from_env())
    }
}

impl<T: Transport> ConduitClient<T> {
    pub fn with_transport(config: EndpointConfig, transport: T) -> Self {
        Self {
            config: RwLock::new(config),
            transport,
        }
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> EndpointConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_config(&self, config: EndpointConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn set_api_token(&self, api_token: &str) {
        self.config.write().unwrap_or_else(PoisonError::into_inner).api_token =
            Some(api_token.to_string());
    }

    pub fn set_base_url(&self, base_url: &str) {
        self.config.write().unwrap_or_else(PoisonError::into_inner).base_url =
            Some(base_url.to_string());
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the request for `method` from the current configuration.
    pub fn build_call(&self, method: &str, params: Params) -> Result<HttpRequest, ConduitError> {
        build_request(&self.config(), method, params)
    }

    /// Parse the reply to a request built for `method`.
    pub fn parse_call(&self, method: &str, response: HttpResponse) -> Result<Value, ConduitError> {
        parse_response(method, response)
    }

    /// Call `method` with `params` and return its `result`.
    pub fn call(&self, method: &str, params: Params) -> Result<Value, ConduitError> {
        let request = self.build_call(method, params)?;
        tracing::debug!(method, url = %request.url, "sending conduit call");
        let response = self
            .transport
            .execute(&request)
            .map_err(|source| ConduitError::Transport {
                method: method.to_string(),
                source,
            })?;
        self.parse_call(method, response)
    }

    /// Run `<object_type>.search`.
    pub fn search(&self, object_type: &str, query: &SearchQuery) -> Result<Value, ConduitError> {
        self.call(&search_method(object_type), query.to_params())
    }

    /// Run `<object_type>.edit`. Without an object id this creates an object.
    pub fn edit(&self, object_type: &str, request: &EditRequest) -> Result<Value, ConduitError> {
        self.call(&edit_method(object_type), request.to_params())
    }

    /// The user the configured token belongs to.
    pub fn whoami(&self) -> Result<Value, ConduitError> {
        self.call("user.whoami", Params::new())
    }

    /// Liveness check; returns the server's host name.
    pub fn ping(&self) -> Result<Value, ConduitError> {
        self.call("conduit.ping", Params::new())
    }
}
