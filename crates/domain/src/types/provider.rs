//! Provider and object type catalogue
//!
//! Providers and object types are closed enums so the adapter registry can be
//! keyed by a typed pair. Slugs are the wire form used by request handlers,
//! configuration and storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, UnibridgeError};

/// Business vertical a provider or object type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vertical {
    Ticketing,
    Crm,
}

/// Third-party system reachable through an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Zendesk,
    Freshsales,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Zendesk, Provider::Freshsales];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Zendesk => "zendesk",
            Self::Freshsales => "freshsales",
        }
    }

    pub fn vertical(self) -> Vertical {
        match self {
            Self::Zendesk => Vertical::Ticketing,
            Self::Freshsales => Vertical::Crm,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Provider {
    type Err = UnibridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let slug = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.slug() == slug)
            .ok_or_else(|| UnibridgeError::unsupported(s, ""))
    }
}

/// Kind of canonical object an adapter converts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Ticket,
    Comment,
    Contact,
}

impl ObjectType {
    pub const ALL: [ObjectType; 3] = [ObjectType::Ticket, ObjectType::Comment, ObjectType::Contact];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Comment => "comment",
            Self::Contact => "contact",
        }
    }

    pub fn vertical(self) -> Vertical {
        match self {
            Self::Ticket | Self::Comment => Vertical::Ticketing,
            Self::Contact => Vertical::Crm,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ObjectType {
    type Err = UnibridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let slug = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|o| o.slug() == slug)
            .ok_or_else(|| UnibridgeError::unsupported("", s))
    }
}

/// Registry key: one adapter per `(provider, object type)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdapterKey {
    pub provider: Provider,
    pub object_type: ObjectType,
}

impl AdapterKey {
    pub const fn new(provider: Provider, object_type: ObjectType) -> Self {
        Self { provider, object_type }
    }

    /// Parse a key from request slugs.
    ///
    /// Either slug being unknown, or the pair crossing verticals (a CRM
    /// provider asked for tickets), is reported as `UnsupportedProvider`
    /// carrying both raw slugs.
    pub fn parse(provider: &str, object_type: &str) -> Result<Self> {
        let unsupported = || UnibridgeError::unsupported(provider, object_type);

        let p = provider.parse::<Provider>().map_err(|_| unsupported())?;
        let o = object_type.parse::<ObjectType>().map_err(|_| unsupported())?;
        if p.vertical() != o.vertical() {
            return Err(unsupported());
        }
        Ok(Self::new(p, o))
    }
}

impl fmt::Display for AdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.provider, self.object_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_parse_case_insensitively() {
        assert_eq!("Zendesk".parse::<Provider>().unwrap(), Provider::Zendesk);
        assert_eq!(" contact ".parse::<ObjectType>().unwrap(), ObjectType::Contact);
    }

    #[test]
    fn unknown_slugs_are_unsupported_not_panics() {
        let err = AdapterKey::parse("hubspot", "ticket").unwrap_err();
        assert!(matches!(
            err,
            UnibridgeError::UnsupportedProvider { ref provider, ref object_type }
                if provider == "hubspot" && object_type == "ticket"
        ));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn cross_vertical_pairs_are_rejected() {
        assert!(AdapterKey::parse("freshsales", "ticket").is_err());
        assert_eq!(
            AdapterKey::parse("zendesk", "comment").unwrap(),
            AdapterKey::new(Provider::Zendesk, ObjectType::Comment)
        );
    }

    #[test]
    fn key_display_is_dotted() {
        let key = AdapterKey::new(Provider::Freshsales, ObjectType::Contact);
        assert_eq!(key.to_string(), "freshsales.contact");
    }
}
