use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use networth_core::credentials::CredentialError;
use networth_core::errors::{DatabaseError, Error as CoreError};
use networth_core::prices::PriceError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Credential(CredentialError::NotFound(_)) => StatusCode::NOT_FOUND,
        CoreError::Credential(CredentialError::AlreadyExists(_)) => StatusCode::CONFLICT,
        CoreError::Credential(CredentialError::UnsupportedCredentialType { .. }) => {
            StatusCode::BAD_REQUEST
        }
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::Price(PriceError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
        CoreError::Price(PriceError::NoDataAvailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::Price(PriceError::ProviderUnavailable { .. }) => StatusCode::BAD_GATEWAY,
        CoreError::Database(DatabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
        CoreError::Database(_)
        | CoreError::Crypto(_)
        | CoreError::InvalidConfigValue(_)
        | CoreError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::Core(e) => (core_status(e), e.to_string()),
            ApiError::NotFound(reason) => (StatusCode::NOT_FOUND, reason.clone()),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            ApiError::Anyhow(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };
        if status.is_server_error() {
            tracing::error!("{} {}", status.as_u16(), msg);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: msg,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use networth_core::credentials::{CredentialType, ServiceType};
    use networth_core::crypto::CryptoError;
    use networth_core::errors::ValidationError;

    fn status_of(err: CoreError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_credential_errors() {
        assert_eq!(
            status_of(CredentialError::NotFound(ServiceType::Plaid).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CredentialError::AlreadyExists(ServiceType::Plaid).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                CredentialError::UnsupportedCredentialType {
                    expected: CredentialType::ApiKey,
                    actual: CredentialType::OAuth,
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_price_errors() {
        assert_eq!(
            status_of(
                PriceError::RateLimited {
                    symbol: "AAPL".to_string(),
                    detail: "daily".to_string(),
                }
                .into()
            ),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(
                PriceError::NoDataAvailable {
                    symbol: "AAPL".to_string(),
                }
                .into()
            ),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(
                PriceError::ProviderUnavailable {
                    provider: "TWELVE_DATA".to_string(),
                    message: "down".to_string(),
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_other_errors() {
        assert_eq!(
            status_of(ValidationError::MissingField("symbol".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CryptoError::DecryptionFailed("tag".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(DatabaseError::QueryFailed("locked".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CoreError::Unexpected("unreadable payload".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
