//! Encryption at rest for stored secrets.

mod encryption_service;

pub use encryption_service::{CryptoError, EncryptionService};
