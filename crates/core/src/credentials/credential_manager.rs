//! Typed facade over the credential store.

use log::debug;
use std::sync::Arc;

use super::credentials_errors::CredentialError;
use super::credentials_model::{
    ApiKeyCredential, BasicAuthCredential, Credential, CredentialData, CredentialType,
    OAuthCredential, ServiceType,
};
use super::credentials_traits::CredentialServiceTrait;
use crate::errors::Result;

pub struct CredentialManager {
    store: Arc<dyn CredentialServiceTrait>,
}

fn mismatch(expected: CredentialType, data: &CredentialData) -> crate::Error {
    CredentialError::UnsupportedCredentialType {
        expected,
        actual: data.credential_type(),
    }
    .into()
}

impl CredentialManager {
    pub fn new(store: Arc<dyn CredentialServiceTrait>) -> Self {
        Self { store }
    }

    pub async fn store_api_key(
        &self,
        service_type: ServiceType,
        name: &str,
        credential: ApiKeyCredential,
    ) -> Result<Credential> {
        self.store
            .store(
                service_type,
                CredentialType::ApiKey,
                name.to_string(),
                CredentialData::ApiKey(credential),
            )
            .await
    }

    pub async fn get_api_key(&self, service_type: ServiceType) -> Result<ApiKeyCredential> {
        match self.store.get_decrypted_data(service_type).await? {
            CredentialData::ApiKey(credential) => Ok(credential),
            other => Err(mismatch(CredentialType::ApiKey, &other)),
        }
    }

    pub async fn update_api_key(
        &self,
        service_type: ServiceType,
        credential: ApiKeyCredential,
    ) -> Result<Credential> {
        self.store
            .update(service_type, CredentialData::ApiKey(credential))
            .await
    }

    pub async fn store_oauth(
        &self,
        service_type: ServiceType,
        name: &str,
        credential: OAuthCredential,
    ) -> Result<Credential> {
        self.store
            .store(
                service_type,
                CredentialType::OAuth,
                name.to_string(),
                CredentialData::OAuth(credential),
            )
            .await
    }

    pub async fn get_oauth(&self, service_type: ServiceType) -> Result<OAuthCredential> {
        match self.store.get_decrypted_data(service_type).await? {
            CredentialData::OAuth(credential) => Ok(credential),
            other => Err(mismatch(CredentialType::OAuth, &other)),
        }
    }

    pub async fn update_oauth(
        &self,
        service_type: ServiceType,
        credential: OAuthCredential,
    ) -> Result<Credential> {
        self.store
            .update(service_type, CredentialData::OAuth(credential))
            .await
    }

    pub async fn store_basic_auth(
        &self,
        service_type: ServiceType,
        name: &str,
        credential: BasicAuthCredential,
    ) -> Result<Credential> {
        self.store
            .store(
                service_type,
                CredentialType::BasicAuth,
                name.to_string(),
                CredentialData::BasicAuth(credential),
            )
            .await
    }

    pub async fn get_basic_auth(&self, service_type: ServiceType) -> Result<BasicAuthCredential> {
        match self.store.get_decrypted_data(service_type).await? {
            CredentialData::BasicAuth(credential) => Ok(credential),
            other => Err(mismatch(CredentialType::BasicAuth, &other)),
        }
    }

    pub async fn update_basic_auth(
        &self,
        service_type: ServiceType,
        credential: BasicAuthCredential,
    ) -> Result<Credential> {
        self.store
            .update(service_type, CredentialData::BasicAuth(credential))
            .await
    }

    /// Store a payload of any shape, e.g. straight from a request body.
    pub async fn store_credential(
        &self,
        service_type: ServiceType,
        name: &str,
        data: CredentialData,
    ) -> Result<Credential> {
        self.store
            .store(service_type, data.credential_type(), name.to_string(), data)
            .await
    }

    pub async fn update_credential(
        &self,
        service_type: ServiceType,
        data: CredentialData,
    ) -> Result<Credential> {
        self.store.update(service_type, data).await
    }

    pub fn get_credential(&self, service_type: ServiceType) -> Result<Credential> {
        self.store.get_by_service(service_type)
    }

    pub async fn delete(&self, service_type: ServiceType) -> Result<()> {
        self.store.delete(service_type).await
    }

    pub fn list(&self) -> Result<Vec<Credential>> {
        self.store.list()
    }

    /// Fetch and decrypt the credential, then discard it.
    pub async fn test_credential(&self, service_type: ServiceType) -> Result<()> {
        let data = self.store.get_decrypted_data(service_type).await?;
        debug!(
            "Credential for '{}' is retrievable ({})",
            service_type,
            data.credential_type()
        );
        Ok(())
    }
}
