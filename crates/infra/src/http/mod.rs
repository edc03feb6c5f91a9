//! HTTP plumbing shared by provider integrations

pub mod client;

pub use client::{ErrorBodyParser, ErrorDetails, HttpClient, HttpClientBuilder};
