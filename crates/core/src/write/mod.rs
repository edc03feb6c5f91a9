//! Write path: canonical object -> provider -> record store

pub mod service;

pub use service::WriteService;
