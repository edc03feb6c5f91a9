//! Cryptographic primitives for sealing provider credentials at rest.

pub mod encryption;

pub use encryption::{SecretCipher, SEALED_SECRET_PREFIX};
