//! Provider-native payload shapes
//!
//! These are never persisted. Every payload is produced by `desunify` and
//! every response is consumed by `unify`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Side channel of custom field values keyed by provider field id
pub type CustomFieldValues = BTreeMap<String, Value>;

/// Direction of an adapter call, carried on errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Push,
    Pull,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Push => "push",
            Self::Pull => "pull",
        })
    }
}

/// What a push should do on the remote side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PushTarget {
    Create,
    Update { remote_id: String },
    /// Attach to an existing parent object (e.g. a comment on a ticket)
    CreateChild { parent_remote_id: String },
}

/// Provider-specific body plus the push target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPayload {
    pub target: PushTarget,
    pub body: Value,
}

impl ProviderPayload {
    /// Payload for a new remote object.
    pub fn create(body: Value) -> Self {
        Self { target: PushTarget::Create, body }
    }

    #[must_use]
    pub fn with_target(mut self, target: PushTarget) -> Self {
        self.target = target;
        self
    }
}

/// One provider-native object as returned by a pull
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderResponse(pub Value);

impl ProviderResponse {
    /// Wrap a raw provider object.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Remote id, accepting numeric or string ids.
    pub fn remote_id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// One page of a pull
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<ProviderResponse>,
    /// Cursor for the following page; `None` means the provider is done
    pub next_cursor: Option<String>,
}

impl Page {
    /// Final page with no cursor.
    pub fn last(items: Vec<ProviderResponse>) -> Self {
        Self { items, next_cursor: None }
    }

    /// True when no page follows.
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// What a pull should fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "remote_id", rename_all = "snake_case")]
pub enum PullSelector {
    /// Every object of the type visible to the connection
    #[default]
    All,
    /// One object by remote id
    Single(String),
    /// Children of a parent object (e.g. the comments of a ticket)
    ChildrenOf(String),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn remote_id_accepts_numbers_and_strings() {
        let numeric = ProviderResponse::new(json!({"id": 35436}));
        assert_eq!(numeric.remote_id().as_deref(), Some("35436"));
        assert_eq!(ProviderResponse::new(json!({"id": "abc"})).remote_id().as_deref(), Some("abc"));
        assert_eq!(ProviderResponse::new(json!({"name": "x"})).remote_id(), None);
    }

    #[test]
    fn page_without_cursor_is_last() {
        assert!(Page::last(vec![]).is_last());
        assert!(!Page { items: vec![], next_cursor: Some("c2".into()) }.is_last());
    }
}
