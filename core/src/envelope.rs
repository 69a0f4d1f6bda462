//! Request and response envelopes for the Conduit wire format.
//!
//! # Design
//! Outbound, a parameter bag is merged with a `__conduit__` authentication
//! block, JSON-encoded, and sent as the `params` field of a form body next to
//! `output=json`. Inbound, the reply is a JSON object whose `error_code`
//! alone decides between success and failure; `result` is handed back
//! untouched on success.
//!
//! Both directions are pure functions so they can be tested without a
//! network and reused by hosts that perform the round trip themselves.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::EndpointConfig;
use crate::error::ConduitError;
use crate::http::{HttpRequest, HttpResponse};

/// Caller-supplied arguments for one call, in insertion order.
pub type Params = Map<String, Value>;

/// Path segment between the base URL and the method name.
pub const API_PATH: &str = "/api/";

/// Reserved parameter key that carries authentication.
pub const CONDUIT_KEY: &str = "__conduit__";

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Build the wire request for `method` with the given parameters.
///
/// Fails with `ConduitError::Configuration` if the base URL or the token is
/// missing. The token is read from `config` on every call. A caller-supplied
/// `__conduit__` entry is replaced by the authentication block.
pub fn build_request(
    config: &EndpointConfig,
    method: &str,
    mut params: Params,
) -> Result<HttpRequest, ConduitError> {
    let base_url = config.require_base_url()?;
    let token = config.require_api_token()?;

    if params.contains_key(CONDUIT_KEY) {
        tracing::warn!(method, "caller supplied reserved `{CONDUIT_KEY}` parameter; replacing it");
    }
    let mut auth = Map::new();
    auth.insert("token".to_string(), Value::String(token.to_string()));
    params.insert(CONDUIT_KEY.to_string(), Value::Object(auth));

    Ok(HttpRequest {
        url: endpoint_url(base_url, method),
        headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
        body: encode_body(&params),
        timeout: config.timeout,
    })
}

/// `<base-url-without-trailing-slash>/api/<method>`.
pub fn endpoint_url(base_url: &str, method: &str) -> String {
    format!("{}{API_PATH}{method}", base_url.trim_end_matches('/'))
}

/// Form-encode `output=json&params=<json>`.
pub fn encode_body(params: &Params) -> String {
    // Display for Value is infallible, unlike serde_json::to_string.
    let json = Value::Object(params.clone()).to_string();
    form_urlencoded::Serializer::new(String::new())
        .append_pair("output", "json")
        .append_pair("params", &json)
        .finish()
}

/// Recover the parameter bag from a form body produced by [`encode_body`].
///
/// Returns `None` if there is no `params` field or it is not a JSON object.
pub fn decode_body(body: &str) -> Option<Params> {
    let (_, json) = form_urlencoded::parse(body.as_bytes()).find(|(key, _)| key == "params")?;
    match serde_json::from_str(&json).ok()? {
        Value::Object(params) => Some(params),
        _ => None,
    }
}

/// The reply to a Conduit call.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error_code: Option<Value>,
    /// Usually a string; other shapes are stringified into the message.
    #[serde(default)]
    pub error_info: Option<Value>,
}

impl ResponseEnvelope {
    /// Turn the envelope into the call outcome for `method`.
    ///
    /// A non-null `error_code` wins even when `result` is also populated.
    pub fn into_result(self, method: &str) -> Result<Value, ConduitError> {
        match self.error_code {
            Some(code) => Err(ConduitError::Api {
                method: method.to_string(),
                code: match code {
                    Value::String(code) => code,
                    other => other.to_string(),
                },
                info: match self.error_info {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(info)) => info,
                    Some(other) => other.to_string(),
                },
            }),
            None => Ok(self.result),
        }
    }
}

/// Parse a transport-level reply into the call outcome for `method`.
///
/// The HTTP status is not consulted: servers report failures through the
/// envelope, and a body that is not an envelope is a `Protocol` error.
pub fn parse_response(method: &str, response: HttpResponse) -> Result<Value, ConduitError> {
    tracing::debug!(method, status = response.status, "conduit response received");
    let protocol_error = || ConduitError::Protocol {
        method: method.to_string(),
    };
    let value: Value = serde_json::from_str(&response.body).map_err(|err| {
        tracing::debug!(method, error = %err, "undecodable conduit response");
        protocol_error()
    })?;
    // Structs also deserialize from sequences; only an object is an envelope.
    if !value.is_object() {
        return Err(protocol_error());
    }
    let envelope = ResponseEnvelope::deserialize(value).map_err(|err| {
        tracing::debug!(method, error = %err, "malformed conduit response envelope");
        protocol_error()
    })?;
    envelope.into_result(method).inspect_err(|err| {
        if let ConduitError::Api { code, .. } = err {
            tracing::debug!(method, code = %code, "conduit call failed");
        }
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> EndpointConfig {
        EndpointConfig::new("https://phab.example.com/", "api-secret")
    }

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn url_strips_trailing_slash_and_appends_method() {
        let req = build_request(&config(), "user.whoami", Params::new()).unwrap();
        assert_eq!(req.url, "https://phab.example.com/api/user.whoami");
    }

    #[test]
    fn request_is_form_encoded() {
        let req = build_request(&config(), "user.whoami", Params::new()).unwrap();
        assert_eq!(req.header("Content-Type"), Some(FORM_CONTENT_TYPE));
        assert!(req.body.starts_with("output=json&params="));
    }

    #[test]
    fn body_keeps_params_and_adds_exactly_one_token() {
        let bag = params(json!({
            "queryKey": "active",
            "constraints": {"projects": ["MyProject"], "ids": [1, 2]},
            "limit": 10
        }));
        let req = build_request(&config(), "project.search", bag.clone()).unwrap();
        let decoded = decode_body(&req.body).unwrap();

        for (key, value) in &bag {
            assert_eq!(decoded.get(key), Some(value), "{key}");
        }
        assert_eq!(decoded.len(), bag.len() + 1);
        assert_eq!(decoded[CONDUIT_KEY], json!({"token": "api-secret"}));
    }

    #[test]
    fn reserved_key_from_caller_is_replaced() {
        let bag = params(json!({"__conduit__": {"token": "forged", "extra": 1}}));
        let req = build_request(&config(), "user.whoami", bag).unwrap();
        let decoded = decode_body(&req.body).unwrap();
        assert_eq!(decoded[CONDUIT_KEY], json!({"token": "api-secret"}));
    }

    #[test]
    fn special_characters_survive_form_encoding() {
        let bag = params(json!({"text": "a&b=c + 100% ünïcode\n"}));
        let req = build_request(&config(), "paste.edit", bag).unwrap();
        assert!(!req.body.contains("a&b"));
        let decoded = decode_body(&req.body).unwrap();
        assert_eq!(decoded["text"], "a&b=c + 100% ünïcode\n");
    }

    #[test]
    fn missing_base_url_is_configuration_error() {
        let config = EndpointConfig::default().with_api_token("api-secret");
        let err = build_request(&config, "user.whoami", Params::new()).unwrap_err();
        assert!(matches!(err, ConduitError::Configuration { field: "base URL" }));
    }

    #[test]
    fn missing_token_is_configuration_error() {
        let config = EndpointConfig::default().with_base_url("https://phab.example.com");
        let err = build_request(&config, "user.whoami", Params::new()).unwrap_err();
        assert!(matches!(err, ConduitError::Configuration { field: "API token" }));
    }

    #[test]
    fn timeout_is_carried_on_the_request() {
        let config = config().with_timeout(std::time::Duration::from_secs(3));
        let req = build_request(&config, "conduit.ping", Params::new()).unwrap();
        assert_eq!(req.timeout, Some(std::time::Duration::from_secs(3)));
    }

    #[test]
    fn success_returns_result_verbatim() {
        for result in [json!(42), json!({"phid": "PHID-USER-1"}), json!([1, "two"]), json!("s")] {
            let body = json!({"result": result.clone(), "error_code": null, "error_info": null}).to_string();
            let value = parse_response("user.whoami", HttpResponse::ok(body)).unwrap();
            assert_eq!(value, result);
        }
    }

    #[test]
    fn null_or_missing_result_is_success_with_null() {
        let value = parse_response("m", HttpResponse::ok(r#"{"result":null}"#)).unwrap();
        assert_eq!(value, Value::Null);
        let value = parse_response("m", HttpResponse::ok("{}")).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn error_code_wins_over_result() {
        let body = r#"{"result":{"ok":true},"error_code":"ERR-INVALID-AUTH","error_info":"bad token"}"#;
        let err = parse_response("user.whoami", HttpResponse::ok(body)).unwrap_err();
        match err {
            ConduitError::Api { method, code, info } => {
                assert_eq!(method, "user.whoami");
                assert_eq!(code, "ERR-INVALID-AUTH");
                assert_eq!(info, "bad token");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn numeric_error_code_is_stringified() {
        let body = r#"{"error_code":500,"error_info":null}"#;
        let err = parse_response("m", HttpResponse::ok(body)).unwrap_err();
        assert_eq!(err.to_string(), "Error 500 in m: ");
    }

    #[test]
    fn non_string_error_info_is_still_api_error() {
        let body = r#"{"result":null,"error_code":"ERR-X","error_info":{"detail":"x"}}"#;
        let err = parse_response("maniphest.edit", HttpResponse::ok(body)).unwrap_err();
        match err {
            ConduitError::Api { method, code, info } => {
                assert_eq!(method, "maniphest.edit");
                assert_eq!(code, "ERR-X");
                assert_eq!(info, r#"{"detail":"x"}"#);
            }
            other => panic!("expected Api error, got {other:?}"),
        }

        let body = r#"{"error_code":"ERR-Y","error_info":404}"#;
        let err = parse_response("m", HttpResponse::ok(body)).unwrap_err();
        assert_eq!(err.to_string(), "Error ERR-Y in m: 404");
    }

    #[test]
    fn undecodable_body_is_protocol_error() {
        for body in ["", "not json", "42", "[1,2]"] {
            let err = parse_response("user.whoami", HttpResponse::ok(body)).unwrap_err();
            assert!(
                matches!(&err, ConduitError::Protocol { method } if method == "user.whoami"),
                "{body:?}"
            );
        }
    }

    #[test]
    fn status_code_does_not_decide_outcome() {
        let response = HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: r#"{"result":"fine"}"#.to_string(),
        };
        assert_eq!(parse_response("m", response).unwrap(), json!("fine"));
    }
}
