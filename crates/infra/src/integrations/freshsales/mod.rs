//! Freshsales CRM integration
//!
//! Requests authenticate with `Authorization: Token token=...`. The API root
//! (`https://{domain}.myfreshworks.com/crm/sales`) comes from the connection's
//! `base_url` metadata or the configured default. Contact lists are read
//! from a saved view with page-number pagination.

pub mod contact;
pub mod types;

pub use contact::{FreshsalesContactAdapter, CONTACT_VIEW_METADATA_KEY};
