//! Credential domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, ValidationError};

/// External service a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Plaid,
    AllyInvest,
    Kraken,
    Fidelity,
    MorganStanley,
    MarketData,
}

impl ServiceType {
    pub const ALL: [ServiceType; 6] = [
        ServiceType::Plaid,
        ServiceType::AllyInvest,
        ServiceType::Kraken,
        ServiceType::Fidelity,
        ServiceType::MorganStanley,
        ServiceType::MarketData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Plaid => "plaid",
            ServiceType::AllyInvest => "ally_invest",
            ServiceType::Kraken => "kraken",
            ServiceType::Fidelity => "fidelity",
            ServiceType::MorganStanley => "morgan_stanley",
            ServiceType::MarketData => "market_data",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ServiceType::ALL
            .into_iter()
            .find(|service| service.as_str() == needle)
            .ok_or_else(|| ValidationError::InvalidInput(format!("Unknown service type '{}'", s)))
    }
}

/// Shape of the decrypted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    ApiKey,
    #[serde(rename = "oauth")]
    OAuth,
    BasicAuth,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::ApiKey => "api_key",
            CredentialType::OAuth => "oauth",
            CredentialType::BasicAuth => "basic_auth",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api_key" => Ok(CredentialType::ApiKey),
            "oauth" => Ok(CredentialType::OAuth),
            "basic_auth" => Ok(CredentialType::BasicAuth),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown credential type '{}'",
                other
            ))),
        }
    }
}

/// Stored credential row. The payload stays encrypted and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: i64,
    pub service_type: ServiceType,
    pub credential_type: CredentialType,
    pub name: String,
    #[serde(skip_serializing)]
    pub encrypted_data: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

/// Input model for inserting a credential row.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub service_type: ServiceType,
    pub credential_type: CredentialType,
    pub name: String,
    pub encrypted_data: String,
}

const REDACTED: &str = "***";

fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| REDACTED)
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field.to_string()).into());
    }
    Ok(())
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyCredential {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl fmt::Debug for ApiKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyCredential")
            .field("key", &REDACTED)
            .field("secret", &redact(&self.secret))
            .field("environment", &self.environment)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCredential {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("client_id", &self.client_id)
            .field("client_secret", &REDACTED)
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuthCredential {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl fmt::Debug for BasicAuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthCredential")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("domain", &self.domain)
            .finish()
    }
}

/// Decrypted credential payload.
///
/// Serialized without a tag: the stored credential type selects the variant
/// when reading it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialData {
    ApiKey(ApiKeyCredential),
    OAuth(OAuthCredential),
    BasicAuth(BasicAuthCredential),
}

impl CredentialData {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            CredentialData::ApiKey(_) => CredentialType::ApiKey,
            CredentialData::OAuth(_) => CredentialType::OAuth,
            CredentialData::BasicAuth(_) => CredentialType::BasicAuth,
        }
    }

    /// Check the fields each variant cannot do without.
    pub fn validate(&self) -> Result<()> {
        match self {
            CredentialData::ApiKey(data) => require("key", &data.key),
            CredentialData::OAuth(data) => {
                require("client_id", &data.client_id)?;
                require("client_secret", &data.client_secret)
            }
            CredentialData::BasicAuth(data) => {
                require("username", &data.username)?;
                require("password", &data.password)
            }
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            CredentialData::ApiKey(data) => serde_json::to_vec(data)?,
            CredentialData::OAuth(data) => serde_json::to_vec(data)?,
            CredentialData::BasicAuth(data) => serde_json::to_vec(data)?,
        };
        Ok(bytes)
    }

    pub fn from_json(credential_type: CredentialType, bytes: &[u8]) -> Result<Self> {
        let data = match credential_type {
            CredentialType::ApiKey => CredentialData::ApiKey(serde_json::from_slice(bytes)?),
            CredentialType::OAuth => CredentialData::OAuth(serde_json::from_slice(bytes)?),
            CredentialType::BasicAuth => CredentialData::BasicAuth(serde_json::from_slice(bytes)?),
        };
        Ok(data)
    }

    /// Build a payload from loosely typed JSON, e.g. a request body.
    pub fn from_value(credential_type: CredentialType, value: serde_json::Value) -> Result<Self> {
        let data = match credential_type {
            CredentialType::ApiKey => CredentialData::ApiKey(serde_json::from_value(value)?),
            CredentialType::OAuth => CredentialData::OAuth(serde_json::from_value(value)?),
            CredentialType::BasicAuth => {
                CredentialData::BasicAuth(serde_json::from_value(value)?)
            }
        };
        Ok(data)
    }
}
