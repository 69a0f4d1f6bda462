use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    routing::post,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_TOKEN: &str = "api-test-token";
pub const DEFAULT_LIMIT: usize = 100;

/// An object stored by `<type>.edit` and returned by `<type>.search`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Object {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub phid: String,
    pub fields: Map<String, Value>,
}

/// Form body of a Conduit call: `output=json&params=<json>`.
#[derive(Debug, Deserialize)]
pub struct CallForm {
    pub output: Option<String>,
    pub params: Option<String>,
}

/// The reply envelope, always sent with HTTP 200.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    pub result: Value,
    pub error_code: Option<String>,
    pub error_info: Option<String>,
}

impl Reply {
    pub fn ok(result: Value) -> Self {
        Self {
            result,
            error_code: None,
            error_info: None,
        }
    }

    pub fn error(code: &str, info: impl Into<String>) -> Self {
        Self {
            result: Value::Null,
            error_code: Some(code.to_string()),
            error_info: Some(info.into()),
        }
    }
}

type CallResult = Result<Value, Reply>;

#[derive(Debug)]
pub struct Store {
    token: String,
    next_id: u64,
    objects: BTreeMap<String, Vec<Object>>,
}

pub type Db = Arc<RwLock<Store>>;

impl Store {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            next_id: 1,
            objects: BTreeMap::new(),
        }
    }

    fn authenticate(&self, params: &Map<String, Value>) -> Result<(), Reply> {
        let token = params
            .get("__conduit__")
            .and_then(|c| c.get("token"))
            .and_then(Value::as_str);
        match token {
            Some(token) if token == self.token => Ok(()),
            Some(_) => Err(Reply::error("ERR-INVALID-AUTH", "API token is not valid.")),
            None => Err(Reply::error(
                "ERR-INVALID-SESSION",
                "Session key is not present.",
            )),
        }
    }

    fn dispatch(&mut self, method: &str, params: &Map<String, Value>) -> CallResult {
        match method {
            "conduit.ping" => Ok(json!("localhost")),
            "user.whoami" => Ok(json!({
                "phid": "PHID-USER-mockuser0000000000",
                "userName": "mock",
                "realName": "Mock User",
                "roles": ["verified", "approved", "activated"]
            })),
            _ => {
                if let Some(kind) = method.strip_suffix(".edit") {
                    self.edit(kind, params)
                } else if let Some(kind) = method.strip_suffix(".search") {
                    Ok(self.search(kind, params))
                } else {
                    Err(Reply::error(
                        "ERR-CONDUIT-CALL",
                        format!("Conduit method '{method}' does not exist."),
                    ))
                }
            }
        }
    }

    /// Apply transactions in order to a new or existing object.
    fn edit(&mut self, kind: &str, params: &Map<String, Value>) -> CallResult {
        let transactions = params
            .get("transactions")
            .and_then(Value::as_array)
            .ok_or_else(|| core_error("Parameter 'transactions' must be a list of transactions."))?;

        let mut changes = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let tx_type = tx
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| core_error("Each transaction must have a 'type'."))?;
            let value = tx.get("value").cloned().unwrap_or(Value::Null);
            changes.push((tx_type.to_string(), value));
        }

        let object = match params.get("objectIdentifier") {
            None | Some(Value::Null) => {
                let object = Object {
                    id: self.next_id,
                    kind: kind.to_string(),
                    phid: new_phid(kind),
                    fields: Map::new(),
                };
                self.next_id += 1;
                let objects = self.objects.entry(kind.to_string()).or_default();
                objects.push(object);
                objects.last_mut()
            }
            Some(identifier) => self
                .objects
                .get_mut(kind)
                .and_then(|objects| objects.iter_mut().find(|o| matches_identifier(o, identifier))),
        }
        .ok_or_else(|| {
            let identifier = params.get("objectIdentifier").cloned().unwrap_or_default();
            core_error(format!("Object {identifier} does not exist."))
        })?;

        let mut applied = Vec::with_capacity(changes.len());
        for (tx_type, value) in changes {
            object.fields.insert(tx_type, value);
            applied.push(json!({"phid": new_phid("XACT")}));
        }

        Ok(json!({
            "object": {"id": object.id, "phid": object.phid},
            "transactions": applied
        }))
    }

    /// Ascending id order, `after` is the last id of the previous page.
    fn search(&self, kind: &str, params: &Map<String, Value>) -> Value {
        let limit = params
            .get("limit")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_LIMIT, |l| l as usize);
        let after = params.get("after").and_then(as_id);
        let ids: Option<Vec<u64>> = params
            .get("constraints")
            .and_then(|c| c.get("ids"))
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(as_id).collect());
        let attachments: Vec<&String> = params
            .get("attachments")
            .and_then(Value::as_object)
            .map(|a| a.keys().collect())
            .unwrap_or_default();

        let mut matching = self
            .objects
            .get(kind)
            .map(|objects| objects.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|o| after.map_or(true, |after| o.id > after))
            .filter(|o| ids.as_ref().map_or(true, |ids| ids.contains(&o.id)))
            .peekable();

        let mut data = Vec::new();
        let mut last_id = None;
        while data.len() < limit {
            let Some(object) = matching.next() else { break };
            let attached: Map<String, Value> = attachments
                .iter()
                .map(|name| ((*name).clone(), json!({})))
                .collect();
            data.push(json!({
                "id": object.id,
                "type": object.kind,
                "phid": object.phid,
                "fields": object.fields,
                "attachments": attached
            }));
            last_id = Some(object.id);
        }
        let next_after = match (matching.peek(), last_id) {
            (Some(_), Some(id)) => Value::String(id.to_string()),
            _ => Value::Null,
        };

        json!({
            "data": data,
            "maps": {},
            "query": {"queryKey": params.get("queryKey").cloned().unwrap_or(Value::Null)},
            "cursor": {
                "limit": limit,
                "after": next_after,
                "before": null,
                "order": params.get("order").cloned().unwrap_or(Value::Null)
            }
        })
    }
}

fn core_error(info: impl Into<String>) -> Reply {
    Reply::error("ERR-CONDUIT-CORE", info)
}

fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn matches_identifier(object: &Object, identifier: &Value) -> bool {
    match identifier {
        Value::String(s) if s.starts_with("PHID-") => object.phid == *s,
        other => as_id(other) == Some(object.id),
    }
}

fn new_phid(kind: &str) -> String {
    let prefix: String = kind
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(4)
        .collect::<String>()
        .to_ascii_uppercase();
    let random = Uuid::new_v4().simple().to_string();
    format!("PHID-{prefix}-{}", &random[..20])
}

pub fn app(token: &str) -> Router {
    let db: Db = Arc::new(RwLock::new(Store::new(token)));
    Router::new()
        .route("/api/{method}", post(call))
        .with_state(db)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

async fn call(
    State(db): State<Db>,
    Path(method): Path<String>,
    Form(form): Form<CallForm>,
) -> Json<Reply> {
    tracing::info!(method = %method, "handling conduit call");
    if form.output.as_deref().is_some_and(|output| output != "json") {
        tracing::debug!(method = %method, output = ?form.output, "non-json output requested");
    }
    let params = match form.params.as_deref().map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(params))) => params,
        _ => return Json(core_error("Parameter 'params' must be a JSON object.")),
    };

    let mut store = db.write().await;
    let reply = store
        .authenticate(&params)
        .and_then(|()| store.dispatch(&method, &params))
        .map_or_else(|err| err, Reply::ok);
    if let Some(code) = &reply.error_code {
        tracing::info!(method = %method, code = %code, "conduit call failed");
    }
    Json(reply)
}
