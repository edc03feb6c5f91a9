//! Canonical objects
//!
//! A canonical object is the provider-agnostic form of a business entity. The
//! fixed attributes of each object type live in a typed struct; anything an
//! organization adds on top lives in the open `field_mappings` bag, keyed by
//! slot name.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::provider::{ObjectType, Provider};

/// Open extension bag: slot name -> value
pub type ExtraFields = BTreeMap<String, Value>;

/// Fixed attributes of a ticket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedTicket {
    pub name: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub ticket_type: Option<String>,
    pub parent_ticket: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub priority: Option<String>,
    #[serde(default)]
    pub assigned_to: Vec<String>,
}

/// Fixed attributes of a ticket comment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedComment {
    pub body: Option<String>,
    pub html_body: Option<String>,
    pub is_private: Option<bool>,
    pub creator_type: Option<String>,
    /// Canonical id of the parent ticket
    pub ticket_id: Option<Uuid>,
    pub contact_id: Option<String>,
    pub user_id: Option<String>,
}

/// Fixed attributes of a CRM contact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    pub job_title: Option<String>,
}

/// Tagged union of the known canonical field sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object_type", content = "attributes", rename_all = "snake_case")]
pub enum CanonicalFields {
    Ticket(UnifiedTicket),
    Comment(UnifiedComment),
    Contact(UnifiedContact),
}

impl CanonicalFields {
    /// Empty field set for an object type.
    pub fn empty(object_type: ObjectType) -> Self {
        match object_type {
            ObjectType::Ticket => Self::Ticket(UnifiedTicket::default()),
            ObjectType::Comment => Self::Comment(UnifiedComment::default()),
            ObjectType::Contact => Self::Contact(UnifiedContact::default()),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Ticket(_) => ObjectType::Ticket,
            Self::Comment(_) => ObjectType::Comment,
            Self::Contact(_) => ObjectType::Contact,
        }
    }

    /// Read a fixed attribute by name as JSON.
    ///
    /// Unset attributes (`None`, empty lists) and unknown names yield `None`,
    /// so callers can treat "absent" uniformly.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        let value = match self {
            Self::Ticket(t) => serde_json::to_value(t),
            Self::Comment(c) => serde_json::to_value(c),
            Self::Contact(c) => serde_json::to_value(c),
        }
        .ok()?;

        match value.get(name)? {
            Value::Null => None,
            Value::Array(items) if items.is_empty() => None,
            other => Some(other.clone()),
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_names().contains(&name)
    }

    /// Names of the fixed attributes of this object type.
    pub fn attribute_names(&self) -> &'static [&'static str] {
        match self {
            Self::Ticket(_) => &[
                "name",
                "status",
                "description",
                "due_date",
                "ticket_type",
                "parent_ticket",
                "tags",
                "completed_at",
                "priority",
                "assigned_to",
            ],
            Self::Comment(_) => &[
                "body",
                "html_body",
                "is_private",
                "creator_type",
                "ticket_id",
                "contact_id",
                "user_id",
            ],
            Self::Contact(_) => {
                &["first_name", "last_name", "email_address", "phone_number", "job_title"]
            }
        }
    }

    /// Ticket fields, if this is a ticket.
    pub fn as_ticket(&self) -> Option<&UnifiedTicket> {
        match self {
            Self::Ticket(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&UnifiedComment> {
        match self {
            Self::Comment(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_contact(&self) -> Option<&UnifiedContact> {
        match self {
            Self::Contact(c) => Some(c),
            _ => None,
        }
    }
}

/// Provider-agnostic business entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalObject {
    /// Internally generated id, stable across providers
    pub id: Uuid,
    /// Id in the remote system of the connection it was read from or written to
    pub remote_id: Option<String>,
    pub fields: CanonicalFields,
    #[serde(default)]
    pub field_mappings: ExtraFields,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl CanonicalObject {
    /// Object with a fresh id and no remote id.
    pub fn new(fields: CanonicalFields) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            remote_id: None,
            fields,
            field_mappings: ExtraFields::new(),
            created_at: now,
            modified_at: now,
        }
    }

    #[must_use]
    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, slot: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field_mappings.insert(slot.into(), value.into());
        self
    }

    pub fn object_type(&self) -> ObjectType {
        self.fields.object_type()
    }

    /// Value for a slot: the extension bag first, then the fixed attribute of
    /// the same name.
    pub fn slot_value(&self, slot: &str) -> Option<Value> {
        self.field_mappings.get(slot).cloned().or_else(|| self.fields.attribute(slot))
    }
}

/// Canonical object persisted for one connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub connection_id: Uuid,
    pub provider: Provider,
    pub remote_id: String,
    pub object: CanonicalObject,
    pub synced_at: DateTime<Utc>,
}

impl CanonicalRecord {
    pub fn object_type(&self) -> ObjectType {
        self.object.object_type()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ticket() -> CanonicalObject {
        CanonicalObject::new(CanonicalFields::Ticket(UnifiedTicket {
            name: Some("Printer on fire".into()),
            priority: Some("urgent".into()),
            ..UnifiedTicket::default()
        }))
    }

    #[test]
    fn attribute_reads_fixed_fields() {
        let object = ticket();
        assert_eq!(object.fields.attribute("priority"), Some(json!("urgent")));
        assert_eq!(object.fields.attribute("status"), None);
        assert_eq!(object.fields.attribute("tags"), None);
        assert_eq!(object.fields.attribute("nonexistent"), None);
    }

    #[test]
    fn slot_value_prefers_extension_bag() {
        let object = ticket().with_field("priority", "low").with_field("severity", 3);
        assert_eq!(object.slot_value("priority"), Some(json!("low")));
        assert_eq!(object.slot_value("severity"), Some(json!(3)));
        assert_eq!(object.slot_value("name"), Some(json!("Printer on fire")));
    }

    #[test]
    fn serialises_with_object_type_tag() {
        let object = ticket();
        let value = serde_json::to_value(&object).unwrap();
        assert_eq!(value["fields"]["object_type"], "ticket");
        assert_eq!(value["fields"]["attributes"]["name"], "Printer on fire");

        let back: CanonicalObject = serde_json::from_value(value).unwrap();
        assert_eq!(back, object);
    }

    #[test]
    fn attribute_names_cover_object_type() {
        let contact = CanonicalFields::empty(ObjectType::Contact);
        assert!(contact.has_attribute("email_address"));
        assert!(!contact.has_attribute("priority"));
        assert_eq!(contact.object_type(), ObjectType::Contact);
    }
}
