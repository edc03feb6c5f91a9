//! Freshsales CRM wire types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::ErrorDetails;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreshsalesContact {
    #[serde(default, skip_serializing)]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(default, skip_serializing)]
    pub work_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    /// Flat `cf_*` map of custom field values
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom_field: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContactEnvelope<'a> {
    pub contact: &'a Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactResponse {
    pub contact: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactsPage {
    #[serde(default)]
    pub contacts: Vec<Value>,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageMeta {
    #[serde(default)]
    pub total_pages: u32,
}

/// Freshsales reports failures as `{"errors": {"code": 400, "message": [...]}}`.
pub fn error_details(body: &Value) -> ErrorDetails {
    let message = match body.pointer("/errors/message") {
        Some(Value::Array(messages)) => {
            let joined = messages.iter().filter_map(Value::as_str).collect::<Vec<_>>().join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        Some(Value::String(message)) => Some(message.clone()),
        _ => None,
    };
    ErrorDetails { field: None, message }
}
