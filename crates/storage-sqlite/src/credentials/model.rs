//! Database models for credentials.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;

use networth_core::credentials::{Credential, CredentialType, NewCredential, ServiceType};

use crate::errors::StorageError;
use crate::utils::{format_timestamp, parse_timestamp};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::credentials)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CredentialDB {
    pub id: i64,
    pub service_type: String,
    pub credential_type: String,
    pub name: String,
    pub encrypted_data: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_used: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::credentials)]
pub struct NewCredentialDB {
    pub service_type: String,
    pub credential_type: String,
    pub name: String,
    pub encrypted_data: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl NewCredentialDB {
    pub fn from_domain(new_credential: NewCredential, now: DateTime<Utc>) -> Self {
        let now = format_timestamp(now);
        Self {
            service_type: new_credential.service_type.as_str().to_string(),
            credential_type: new_credential.credential_type.as_str().to_string(),
            name: new_credential.name,
            encrypted_data: new_credential.encrypted_data,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl TryFrom<CredentialDB> for Credential {
    type Error = StorageError;

    fn try_from(db: CredentialDB) -> Result<Self, Self::Error> {
        let service_type = ServiceType::from_str(&db.service_type)
            .map_err(|e| StorageError::CorruptRow(format!("credential {}: {}", db.id, e)))?;
        let credential_type = CredentialType::from_str(&db.credential_type)
            .map_err(|e| StorageError::CorruptRow(format!("credential {}: {}", db.id, e)))?;

        Ok(Credential {
            id: db.id,
            service_type,
            credential_type,
            name: db.name,
            encrypted_data: db.encrypted_data,
            is_active: db.is_active,
            created_at: parse_timestamp(&db.created_at)?,
            updated_at: parse_timestamp(&db.updated_at)?,
            last_used: db.last_used.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}
