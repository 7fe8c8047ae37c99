use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;

use super::credentials_errors::CredentialError;
use super::credentials_model::{
    Credential, CredentialData, CredentialType, NewCredential, ServiceType,
};
use super::credentials_traits::{CredentialRepositoryTrait, CredentialServiceTrait};
use crate::crypto::EncryptionService;
use crate::errors::{Error, Result, ValidationError};

/// Encrypted store of one active credential per external service.
pub struct CredentialStore {
    repository: Arc<dyn CredentialRepositoryTrait>,
    encryption: Arc<EncryptionService>,
}

impl CredentialStore {
    pub fn new(
        repository: Arc<dyn CredentialRepositoryTrait>,
        encryption: Arc<EncryptionService>,
    ) -> Self {
        Self {
            repository,
            encryption,
        }
    }

    fn seal(&self, data: &CredentialData) -> Result<String> {
        let plaintext = data.to_json()?;
        Ok(self.encryption.encrypt(&plaintext)?)
    }

    fn open(&self, credential: &Credential) -> Result<CredentialData> {
        let plaintext = self.encryption.decrypt(&credential.encrypted_data)?;
        // A payload that decrypts but does not parse is stored corruption, not bad input.
        CredentialData::from_json(credential.credential_type, &plaintext).map_err(|e| {
            Error::Unexpected(format!(
                "Stored {} credential for '{}' is unreadable: {}",
                credential.credential_type, credential.service_type, e
            ))
        })
    }
}

#[async_trait]
impl CredentialServiceTrait for CredentialStore {
    async fn store(
        &self,
        service_type: ServiceType,
        credential_type: CredentialType,
        name: String,
        data: CredentialData,
    ) -> Result<Credential> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        data.validate()?;
        if data.credential_type() != credential_type {
            return Err(CredentialError::UnsupportedCredentialType {
                expected: credential_type,
                actual: data.credential_type(),
            }
            .into());
        }

        let encrypted_data = self.seal(&data)?;
        let credential = self
            .repository
            .insert_if_absent(NewCredential {
                service_type,
                credential_type,
                name,
                encrypted_data,
            })
            .await?;

        info!(
            "Stored {} credential for service '{}'",
            credential_type, service_type
        );
        Ok(credential)
    }

    fn get_by_service(&self, service_type: ServiceType) -> Result<Credential> {
        self.repository
            .get_active(service_type)?
            .ok_or_else(|| CredentialError::NotFound(service_type).into())
    }

    async fn get_decrypted_data(&self, service_type: ServiceType) -> Result<CredentialData> {
        let credential = self.get_by_service(service_type)?;
        let data = self.open(&credential)?;

        if let Err(e) = self.repository.touch_last_used(credential.id).await {
            warn!(
                "Failed to record last use of credential for '{}': {}",
                service_type, e
            );
        }

        debug!("Decrypted credential for service '{}'", service_type);
        Ok(data)
    }

    async fn update(&self, service_type: ServiceType, data: CredentialData) -> Result<Credential> {
        data.validate()?;
        let existing = self.get_by_service(service_type)?;
        if existing.credential_type != data.credential_type() {
            return Err(CredentialError::UnsupportedCredentialType {
                expected: existing.credential_type,
                actual: data.credential_type(),
            }
            .into());
        }

        let encrypted_data = self.seal(&data)?;
        let updated = self
            .repository
            .update_payload(existing.id, encrypted_data)
            .await?
            .ok_or(CredentialError::NotFound(service_type))?;

        info!("Updated credential for service '{}'", service_type);
        Ok(updated)
    }

    async fn delete(&self, service_type: ServiceType) -> Result<()> {
        let affected = self.repository.deactivate(service_type).await?;
        if affected > 0 {
            info!("Deactivated credential for service '{}'", service_type);
        } else {
            debug!("No active credential to delete for '{}'", service_type);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<Credential>> {
        self.repository.list_active()
    }
}
