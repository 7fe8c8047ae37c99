use async_trait::async_trait;

use super::credentials_model::{Credential, CredentialData, CredentialType, NewCredential, ServiceType};
use crate::errors::Result;

/// Trait for credential repository operations
#[async_trait]
pub trait CredentialRepositoryTrait: Send + Sync {
    /// The active credential for a service, if any.
    fn get_active(&self, service_type: ServiceType) -> Result<Option<Credential>>;

    /// All active credentials ordered by service type.
    fn list_active(&self) -> Result<Vec<Credential>>;

    /// Insert an active credential.
    ///
    /// The existence check and the insert are atomic; an active row for the
    /// same service fails with `CredentialError::AlreadyExists`.
    async fn insert_if_absent(&self, new_credential: NewCredential) -> Result<Credential>;

    /// Replace the payload of the credential row `credential_id`, provided it is
    /// still active. `None` if the row was deactivated in the meantime.
    async fn update_payload(
        &self,
        credential_id: i64,
        encrypted_data: String,
    ) -> Result<Option<Credential>>;

    /// Soft-delete the active credential. Returns the number of rows changed.
    async fn deactivate(&self, service_type: ServiceType) -> Result<usize>;

    /// Stamp `last_used` on a credential row.
    async fn touch_last_used(&self, credential_id: i64) -> Result<()>;
}

/// Trait for credential store operations
#[async_trait]
pub trait CredentialServiceTrait: Send + Sync {
    async fn store(
        &self,
        service_type: ServiceType,
        credential_type: CredentialType,
        name: String,
        data: CredentialData,
    ) -> Result<Credential>;
    fn get_by_service(&self, service_type: ServiceType) -> Result<Credential>;
    async fn get_decrypted_data(&self, service_type: ServiceType) -> Result<CredentialData>;
    async fn update(&self, service_type: ServiceType, data: CredentialData) -> Result<Credential>;
    async fn delete(&self, service_type: ServiceType) -> Result<()>;
    fn list(&self) -> Result<Vec<Credential>>;
}
