//! Infrastructure error boundary

mod conversions;

pub use conversions::{provider_call_error, InfraError};
