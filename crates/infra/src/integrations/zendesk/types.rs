//! Zendesk Support API wire types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::ErrorDetails;

/// Ticket as read from and written to `/api/v2/tickets`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZendeskTicket {
    #[serde(default, skip_serializing)]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Read-only on the API; set through the first comment
    #[serde(default, skip_serializing)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<ZendeskComment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<u64>,
    #[serde(default, skip_serializing)]
    pub problem_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<ZendeskCustomField>,
}

/// Ticket comment; `public: false` marks an internal note
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZendeskComment {
    #[serde(default, skip_serializing)]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(default, skip_serializing)]
    pub author_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZendeskCustomField {
    /// Numeric on the wire; kept as JSON so ids pass through untouched
    pub id: Value,
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct TicketEnvelope<'a> {
    pub ticket: &'a Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketResponse {
    pub ticket: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketsPage {
    #[serde(default)]
    pub tickets: Vec<Value>,
    #[serde(default)]
    pub meta: CursorMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentsPage {
    #[serde(default)]
    pub comments: Vec<Value>,
    #[serde(default)]
    pub meta: CursorMeta,
}

/// Cursor pagination block (`page[size]` / `page[after]`)
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CursorMeta {
    #[serde(default)]
    pub has_more: bool,
    pub after_cursor: Option<String>,
}

impl CursorMeta {
    /// Cursor of the next page, `None` on the last one.
    pub fn next_cursor(self) -> Option<String> {
        if self.has_more {
            self.after_cursor
        } else {
            None
        }
    }
}

/// Response of a ticket update carrying a new comment
#[derive(Debug, Deserialize)]
pub(crate) struct TicketAuditResponse {
    pub audit: Option<TicketAudit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketAudit {
    #[serde(default)]
    pub events: Vec<AuditEvent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuditEvent {
    pub id: Value,
    #[serde(rename = "type")]
    pub event_type: String,
}

/// Pull message and blamed field out of a Zendesk error body.
///
/// Validation failures look like
/// `{"error": "RecordInvalid", "details": {"subject": [{"description": "..."}]}}`.
pub fn error_details(body: &Value) -> ErrorDetails {
    let Some((field, problems)) =
        body.get("details").and_then(Value::as_object).and_then(|d| d.iter().next())
    else {
        return ErrorDetails::default();
    };

    let message = problems
        .as_array()
        .and_then(|p| p.first())
        .and_then(|p| p.get("description"))
        .and_then(Value::as_str)
        .map(str::to_string);

    ErrorDetails { field: Some(field.clone()), message }
}
