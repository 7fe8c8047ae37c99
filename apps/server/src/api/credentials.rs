use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use networth_core::credentials::{Credential, CredentialData, CredentialType, ServiceType};
use networth_core::errors::Error as CoreError;
use serde::{Deserialize, Serialize};

use crate::{error::ApiResult, main_lib::AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreCredentialRequest {
    service_type: String,
    credential_type: String,
    name: String,
    data: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCredentialRequest {
    credential_type: String,
    data: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialCheck {
    service_type: ServiceType,
    ok: bool,
}

fn parse_service(raw: &str) -> Result<ServiceType, CoreError> {
    Ok(ServiceType::from_str(raw)?)
}

fn parse_payload(credential_type: &str, data: serde_json::Value) -> Result<CredentialData, CoreError> {
    let credential_type = CredentialType::from_str(credential_type)?;
    CredentialData::from_value(credential_type, data)
}

async fn list_credentials(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Credential>>> {
    let credentials = state.credential_manager.list()?;
    Ok(Json(credentials))
}

async fn store_credential(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StoreCredentialRequest>,
) -> ApiResult<(StatusCode, Json<Credential>)> {
    let service_type = parse_service(&body.service_type)?;
    let data = parse_payload(&body.credential_type, body.data)?;
    let credential = state
        .credential_manager
        .store_credential(service_type, &body.name, data)
        .await?;
    Ok((StatusCode::CREATED, Json(credential)))
}

async fn get_credential(
    Path(service): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Credential>> {
    let credential = state
        .credential_manager
        .get_credential(parse_service(&service)?)?;
    Ok(Json(credential))
}

async fn update_credential(
    Path(service): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateCredentialRequest>,
) -> ApiResult<Json<Credential>> {
    let service_type = parse_service(&service)?;
    let data = parse_payload(&body.credential_type, body.data)?;
    let credential = state
        .credential_manager
        .update_credential(service_type, data)
        .await?;
    Ok(Json(credential))
}

async fn delete_credential(
    Path(service): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state
        .credential_manager
        .delete(parse_service(&service)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn test_credential(
    Path(service): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CredentialCheck>> {
    let service_type = parse_service(&service)?;
    state.credential_manager.test_credential(service_type).await?;
    Ok(Json(CredentialCheck {
        service_type,
        ok: true,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/credentials", get(list_credentials).post(store_credential))
        .route(
            "/credentials/{service}",
            get(get_credential)
                .put(update_credential)
                .delete(delete_credential),
        )
        .route("/credentials/{service}/test", post(test_credential))
}
