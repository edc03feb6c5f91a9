//! Field mapping types
//!
//! A field mapping ties an organization-defined slot (either a custom slot
//! name or a canonical attribute name) to a provider's custom field id for
//! one `(provider, object type)` pair.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::provider::{AdapterKey, ObjectType, Provider};
use crate::errors::{Result, UnibridgeError};

/// Which transforms a mapping participates in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingDirection {
    /// Applied on both write (desunify) and read (unify)
    #[default]
    Both,
    /// Applied only when reading from the provider
    ReadOnly,
    /// Applied only when writing to the provider
    WriteOnly,
}

impl MappingDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::ReadOnly => "read_only",
            Self::WriteOnly => "write_only",
        }
    }

    pub fn applies_on_write(self) -> bool {
        matches!(self, Self::Both | Self::WriteOnly)
    }

    pub fn applies_on_read(self) -> bool {
        matches!(self, Self::Both | Self::ReadOnly)
    }
}

impl FromStr for MappingDirection {
    type Err = UnibridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "both" => Ok(Self::Both),
            "read_only" => Ok(Self::ReadOnly),
            "write_only" => Ok(Self::WriteOnly),
            other => {
                Err(UnibridgeError::InvalidInput(format!("unknown mapping direction: {other}")))
            }
        }
    }
}

/// Declared type of a mapped custom field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDataType {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
    Json,
}

impl FieldDataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Json => "json",
        }
    }

    /// Coerce a provider value into this type.
    ///
    /// Returns `None` when the value cannot be represented; callers keep the
    /// raw value in that case. `null` is passed through for every type.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }

        match (self, value) {
            (Self::Json, v) => Some(v.clone()),
            (Self::Text, Value::String(_)) => Some(value.clone()),
            (Self::Text, Value::Number(n)) => Some(Value::String(n.to_string())),
            (Self::Text, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (Self::Number, Value::Number(_)) => Some(value.clone()),
            (Self::Number, Value::String(s)) => parse_number(s.trim()),
            (Self::Boolean, Value::Bool(_)) => Some(value.clone()),
            (Self::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            (Self::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            (Self::Date, Value::String(s)) => normalise_date(s.trim()),
            _ => None,
        }
    }
}

impl FromStr for FieldDataType {
    type Err = UnibridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "json" => Ok(Self::Json),
            other => Err(UnibridgeError::InvalidInput(format!("unknown field data type: {other}"))),
        }
    }
}

impl fmt::Display for FieldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(Value::Number)
}

fn normalise_date(s: &str) -> Option<Value> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Value::String(dt.with_timezone(&Utc).to_rfc3339()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(|d| Value::String(d.to_string()))
}

/// Admin-configured correspondence between a slot and a provider custom field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub id: Uuid,
    pub organization_id: String,
    /// Canonical attribute name or custom slot name
    pub standard_slot: String,
    pub provider: Provider,
    pub object_type: ObjectType,
    /// Provider-native custom field identifier
    pub remote_field_id: String,
    #[serde(default)]
    pub data_type: FieldDataType,
    #[serde(default)]
    pub direction: MappingDirection,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl FieldMapping {
    /// Active read-write text mapping.
    pub fn new(
        organization_id: impl Into<String>,
        standard_slot: impl Into<String>,
        key: AdapterKey,
        remote_field_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id: organization_id.into(),
            standard_slot: standard_slot.into(),
            provider: key.provider,
            object_type: key.object_type,
            remote_field_id: remote_field_id.into(),
            data_type: FieldDataType::default(),
            direction: MappingDirection::default(),
            active: true,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_data_type(mut self, data_type: FieldDataType) -> Self {
        self.data_type = data_type;
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: MappingDirection) -> Self {
        self.direction = direction;
        self
    }

    /// `(provider, object type)` the mapping applies to.
    pub fn key(&self) -> AdapterKey {
        AdapterKey::new(self.provider, self.object_type)
    }

    /// Whether `other` occupies the same uniqueness slot as this mapping.
    pub fn same_slot(&self, other: &FieldMapping) -> bool {
        self.organization_id == other.organization_id
            && self.standard_slot == other.standard_slot
            && self.provider == other.provider
            && self.object_type == other.object_type
    }

    /// Reject mappings that cannot be stored.
    pub fn validate(&self) -> Result<()> {
        if self.organization_id.trim().is_empty() {
            return Err(UnibridgeError::InvalidInput("organization_id must not be empty".into()));
        }
        if self.standard_slot.trim().is_empty() {
            return Err(UnibridgeError::InvalidInput("standard_slot must not be empty".into()));
        }
        if self.remote_field_id.trim().is_empty() {
            return Err(UnibridgeError::InvalidInput("remote_field_id must not be empty".into()));
        }
        if self.provider.vertical() != self.object_type.vertical() {
            return Err(UnibridgeError::unsupported(
                self.provider.slug(),
                self.object_type.slug(),
            ));
        }
        Ok(())
    }
}
