//! Error types for the Conduit client.
//!
//! # Design
//! A call either succeeds with the remote `result` or fails with exactly one
//! of four kinds. `Configuration` is raised locally before any I/O;
//! `Transport` covers the round trip itself; `Protocol` means a reply
//! arrived but was not a decodable response envelope; `Api` carries the
//! error the remote side reported. None of them is retried internally.

use std::error::Error as StdError;

/// A connection-level failure reported by a [`Transport`](crate::Transport).
///
/// Wraps the underlying cause so custom transports can surface their own
/// error types.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct TransportError(Box<dyn StdError + Send + Sync + 'static>);

impl TransportError {
    pub fn new(cause: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self(cause.into())
    }
}

/// Errors returned by `ConduitClient` calls.
#[derive(Debug, thiserror::Error)]
pub enum ConduitError {
    /// The endpoint configuration lacks a required field. Nothing was sent.
    #[error("configuration error: {field} is not set")]
    Configuration { field: &'static str },

    /// The HTTP round trip failed (connection refused, timeout, broken
    /// transport response).
    #[error("transport error in {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: TransportError,
    },

    /// The reply body was absent or not a response envelope.
    #[error("no result returned for {method}")]
    Protocol { method: String },

    /// The remote side reported an error for this call.
    #[error("Error {code} in {method}: {info}")]
    Api {
        method: String,
        code: String,
        info: String,
    },
}

impl ConduitError {
    /// The method the failing call targeted, if the failure got that far.
    pub fn method(&self) -> Option<&str> {
        match self {
            ConduitError::Configuration { .. } => None,
            ConduitError::Transport { method, .. }
            | ConduitError::Protocol { method }
            | ConduitError::Api { method, .. } => Some(method),
        }
    }

    /// The remote error code, for `Api` failures.
    pub fn code(&self) -> Option<&str> {
        match self {
            ConduitError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConduitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_names_code_method_and_message() {
        let err = ConduitError::Api {
            method: "paste.edit".to_string(),
            code: "ERR-CONDUIT-CORE".to_string(),
            info: "Paste title is required.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error ERR-CONDUIT-CORE in paste.edit: Paste title is required."
        );
        assert_eq!(err.method(), Some("paste.edit"));
        assert_eq!(err.code(), Some("ERR-CONDUIT-CORE"));
    }

    #[test]
    fn protocol_error_display_names_method() {
        let err = ConduitError::Protocol {
            method: "user.whoami".to_string(),
        };
        assert_eq!(err.to_string(), "no result returned for user.whoami");
    }

    #[test]
    fn configuration_error_names_missing_field() {
        let err = ConduitError::Configuration { field: "api token" };
        assert!(err.to_string().contains("api token"));
        assert_eq!(err.method(), None);
    }

    #[test]
    fn transport_error_chains_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ConduitError::Transport {
            method: "conduit.ping".to_string(),
            source: TransportError::new(io),
        };
        assert!(err.to_string().contains("conduit.ping"));
        assert!(err.to_string().contains("refused"));
        assert!(StdError::source(&err).is_some());
    }
}
