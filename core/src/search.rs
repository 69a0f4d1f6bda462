//! Parameter shaping for `<type>.search` calls.
//!
//! # Design
//! Only fields the caller set reach the wire; unset options are absent, not
//! null. Constraints are passed through as given. Attachment names become a
//! `{name: true}` mapping.
//!
//! `before` is only sent together with `after`; a cursor holding `before`
//! alone drops it.

use serde_json::{Map, Value};

use crate::envelope::Params;

/// Method name for a search over `object_type`.
pub fn search_method(object_type: &str) -> String {
    format!("{object_type}.search")
}

/// Pagination state threaded between successive searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub order: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub limit: Option<u64>,
}

impl Cursor {
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// The cursor for the page following `result`, a prior search result.
    ///
    /// Reads the result's `cursor` block. Returns `None` when the block is
    /// missing or its `after` is null, meaning there are no more pages.
    /// Numeric tokens are stringified; `before` is not carried forward.
    pub fn next_page(result: &Value) -> Option<Self> {
        let cursor = result.get("cursor")?;
        let after = token(cursor.get("after"))?;
        Some(Self {
            order: cursor.get("order").and_then(Value::as_str).map(str::to_string),
            after: Some(after),
            before: None,
            limit: cursor.get("limit").and_then(Value::as_u64),
        })
    }

    fn write_into(&self, params: &mut Params) {
        if let Some(order) = &self.order {
            params.insert("order".to_string(), Value::String(order.clone()));
        }
        if let Some(after) = &self.after {
            params.insert("after".to_string(), Value::String(after.clone()));
            if let Some(before) = &self.before {
                params.insert("before".to_string(), Value::String(before.clone()));
            }
        }
        if let Some(limit) = self.limit {
            params.insert("limit".to_string(), Value::from(limit));
        }
    }
}

fn token(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Arguments of a search call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub query_key: Option<String>,
    pub constraints: Option<Map<String, Value>>,
    pub attachments: Vec<String>,
    pub cursor: Option<Cursor>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a predefined query such as `"active"` or `"all"`.
    pub fn query_key(mut self, key: &str) -> Self {
        self.query_key = Some(key.to_string());
        self
    }

    pub fn constraints(mut self, constraints: Map<String, Value>) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Add one constraint, creating the mapping if needed.
    pub fn constraint(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.constraints
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), value.into());
        self
    }

    pub fn attachment(mut self, name: &str) -> Self {
        self.attachments.push(name.to_string());
        self
    }

    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// The parameter bag for this query.
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(key) = &self.query_key {
            params.insert("queryKey".to_string(), Value::String(key.clone()));
        }
        if let Some(constraints) = &self.constraints {
            params.insert("constraints".to_string(), Value::Object(constraints.clone()));
        }
        if !self.attachments.is_empty() {
            let attachments = self
                .attachments
                .iter()
                .map(|name| (name.clone(), Value::Bool(true)))
                .collect();
            params.insert("attachments".to_string(), Value::Object(attachments));
        }
        if let Some(cursor) = &self.cursor {
            cursor.write_into(&mut params);
        }
        params
    }
}
