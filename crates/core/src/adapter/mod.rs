//! Provider adapter contract
//!
//! One adapter exists per `(provider, object type)` pair. Transforms are pure
//! and synchronous; only `push` and `pull` perform I/O.

pub mod context;
pub mod ports;

pub use context::CallContext;
pub use ports::{ProviderAdapter, SecretDecryptor, Unified};
