use thiserror::Error;

use super::credentials_model::{CredentialType, ServiceType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No active credential for service '{0}'")]
    NotFound(ServiceType),

    #[error("An active credential for service '{0}' already exists")]
    AlreadyExists(ServiceType),

    #[error("Unsupported credential type: expected {expected}, got {actual}")]
    UnsupportedCredentialType {
        expected: CredentialType,
        actual: CredentialType,
    },
}
