//! Synchronous client for Conduit-style RPC APIs.
//!
//! # Overview
//! Every remote method is a POST to `<base-url>/api/<method>` carrying a
//! form-encoded JSON parameter bag plus a `__conduit__` token block. The
//! reply envelope is normalized into either the remote `result` or one
//! `ConduitError`.
//!
//! # Design
//! - `envelope` builds requests and parses replies as pure functions.
//! - `Transport` performs the single blocking round trip; `UreqTransport`
//!   is the default.
//! - `ConduitClient` ties them together and adds the `search` and `edit`
//!   call shapes built by `SearchQuery` and `EditRequest`.
//! - No caching, retries or per-method schema checks: the client is
//!   method-agnostic.
//!
//! ```no_run
//! use conduit_core::{ConduitClient, EditRequest, EndpointConfig, SearchQuery};
//!
//! let client = ConduitClient::new(EndpointConfig::new("https://phab.example.com", "api-token"));
//! let me = client.whoami()?;
//! let active = client.search("project", &SearchQuery::new().query_key("active"))?;
//! let paste = client.edit(
//!     "paste",
//!     &EditRequest::create().transaction("title", "Example").transaction("text", "Hello World"),
//! )?;
//! # let _ = (me, active, paste);
//! # Ok::<(), conduit_core::ConduitError>(())
//! ```

pub mod client;
pub mod config;
pub mod edit;
pub mod envelope;
pub mod error;
pub mod http;
pub mod search;
pub mod transport;

pub use client::ConduitClient;
pub use config::EndpointConfig;
pub use edit::{EditRequest, ObjectId, Transaction};
pub use envelope::{Params, ResponseEnvelope};
pub use error::{ConduitError, Result, TransportError};
pub use http::{HttpRequest, HttpResponse};
pub use search::{Cursor, SearchQuery};
pub use transport::{Transport, UreqTransport};
