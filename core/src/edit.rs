//! Parameter shaping for `<type>.edit` calls.
//!
//! # Design
//! Transactions go on the wire in exactly the order given; the server
//! applies them in sequence. Leaving out the object identifier asks the
//! server to create a new object, so there is no separate "create" call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Params;

/// Method name for an edit of `object_type`.
pub fn edit_method(object_type: &str) -> String {
    format!("{object_type}.edit")
}

/// One field-level change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
}

impl Transaction {
    pub fn new(kind: &str, value: impl Into<Value>) -> Self {
        Self {
            kind: kind.to_string(),
            value: value.into(),
        }
    }
}

impl<V: Into<Value>> From<(&str, V)> for Transaction {
    fn from((kind, value): (&str, V)) -> Self {
        Self::new(kind, value)
    }
}

/// Identifier of an existing object: a numeric ID or a PHID/monogram string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectId {
    Id(i64),
    Name(String),
}

impl From<i64> for ObjectId {
    fn from(id: i64) -> Self {
        ObjectId::Id(id)
    }
}

impl From<&str> for ObjectId {
    fn from(name: &str) -> Self {
        ObjectId::Name(name.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(name: String) -> Self {
        ObjectId::Name(name)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        match id {
            ObjectId::Id(id) => Value::from(id),
            ObjectId::Name(name) => Value::String(name),
        }
    }
}

/// Arguments of an edit call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditRequest {
    pub transactions: Vec<Transaction>,
    /// `None` creates a new object.
    pub object_id: Option<ObjectId>,
}

impl EditRequest {
    /// Edit that creates a new object.
    pub fn create() -> Self {
        Self::default()
    }

    /// Edit of the existing object `id`.
    pub fn update(id: impl Into<ObjectId>) -> Self {
        Self {
            transactions: Vec::new(),
            object_id: Some(id.into()),
        }
    }

    /// Append a transaction after those already added.
    pub fn transaction(mut self, kind: &str, value: impl Into<Value>) -> Self {
        self.transactions.push(Transaction::new(kind, value));
        self
    }

    /// The parameter bag for this edit.
    pub fn to_params(&self) -> Params {
        // A string and a JSON value always serialize.
        let transactions = self
            .transactions
            .iter()
            .filter_map(|tx| serde_json::to_value(tx).ok())
            .collect();

        let mut params = Params::new();
        params.insert("transactions".to_string(), Value::Array(transactions));
        if let Some(id) = &self.object_id {
            params.insert("objectIdentifier".to_string(), id.clone().into());
        }
        params
    }
}
