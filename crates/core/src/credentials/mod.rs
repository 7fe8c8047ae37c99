//! Credentials module - encrypted store of linked-service secrets.

mod credential_manager;
mod credentials_errors;
mod credentials_model;
mod credentials_service;
mod credentials_traits;


pub use credential_manager::CredentialManager;
pub use credentials_errors::CredentialError;
pub use credentials_model::{
    ApiKeyCredential, BasicAuthCredential, Credential, CredentialData, CredentialType,
    NewCredential, OAuthCredential, ServiceType,
};
pub use credentials_service::CredentialStore;
pub use credentials_traits::{CredentialRepositoryTrait, CredentialServiceTrait};
