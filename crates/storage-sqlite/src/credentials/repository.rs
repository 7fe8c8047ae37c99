use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::sync::Arc;

use networth_core::credentials::{
    Credential, CredentialError, CredentialRepositoryTrait, NewCredential, ServiceType,
};
use networth_core::errors::{Error, Result};

use super::model::{CredentialDB, NewCredentialDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::{is_unique_violation, IntoCore, StorageError};
use crate::schema::credentials;
use crate::utils::format_timestamp;

pub struct CredentialRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl CredentialRepository {
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>, writer: WriteHandle) -> Self {
        CredentialRepository { pool, writer }
    }
}

fn to_domain(rows: Vec<CredentialDB>) -> Result<Vec<Credential>> {
    rows.into_iter()
        .map(|row| Credential::try_from(row).map_err(Error::from))
        .collect()
}

#[async_trait]
impl CredentialRepositoryTrait for CredentialRepository {
    fn get_active(&self, service_type: ServiceType) -> Result<Option<Credential>> {
        let mut conn = get_connection(&self.pool)?;
        let row = credentials::table
            .filter(credentials::service_type.eq(service_type.as_str()))
            .filter(credentials::is_active.eq(true))
            .select(CredentialDB::as_select())
            .first::<CredentialDB>(&mut conn)
            .optional()
            .into_core()?;

        row.map(|r| Credential::try_from(r).map_err(Error::from))
            .transpose()
    }

    fn list_active(&self) -> Result<Vec<Credential>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = credentials::table
            .filter(credentials::is_active.eq(true))
            .order(credentials::service_type.asc())
            .select(CredentialDB::as_select())
            .load::<CredentialDB>(&mut conn)
            .into_core()?;
        to_domain(rows)
    }

    async fn insert_if_absent(&self, new_credential: NewCredential) -> Result<Credential> {
        let service_type = new_credential.service_type;
        let row = NewCredentialDB::from_domain(new_credential, Utc::now());

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Credential> {
                let exists = diesel::select(diesel::dsl::exists(
                    credentials::table
                        .filter(credentials::service_type.eq(service_type.as_str()))
                        .filter(credentials::is_active.eq(true)),
                ))
                .get_result::<bool>(conn)
                .into_core()?;

                if exists {
                    return Err(CredentialError::AlreadyExists(service_type).into());
                }

                let inserted = diesel::insert_into(credentials::table)
                    .values(&row)
                    .returning(CredentialDB::as_returning())
                    .get_result::<CredentialDB>(conn)
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            Error::from(CredentialError::AlreadyExists(service_type))
                        } else {
                            Error::from(StorageError::from(e))
                        }
                    })?;

                debug!("Inserted credential {} for {}", inserted.id, service_type);
                Ok(Credential::try_from(inserted)?)
            })
            .await
    }

    async fn update_payload(
        &self,
        credential_id: i64,
        encrypted_data: String,
    ) -> Result<Option<Credential>> {
        let now = format_timestamp(Utc::now());

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Option<Credential>> {
                let updated = diesel::update(
                    credentials::table
                        .find(credential_id)
                        .filter(credentials::is_active.eq(true)),
                )
                .set((
                    credentials::encrypted_data.eq(encrypted_data),
                    credentials::updated_at.eq(now),
                ))
                .returning(CredentialDB::as_returning())
                .get_result::<CredentialDB>(conn)
                .optional()
                .into_core()?;

                Ok(updated.map(Credential::try_from).transpose()?)
            })
            .await
    }

    async fn deactivate(&self, service_type: ServiceType) -> Result<usize> {
        let now = format_timestamp(Utc::now());

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::update(
                    credentials::table
                        .filter(credentials::service_type.eq(service_type.as_str()))
                        .filter(credentials::is_active.eq(true)),
                )
                .set((
                    credentials::is_active.eq(false),
                    credentials::updated_at.eq(now),
                ))
                .execute(conn)
                .into_core()
            })
            .await
    }

    async fn touch_last_used(&self, credential_id: i64) -> Result<()> {
        let now = format_timestamp(Utc::now());

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(credentials::table.find(credential_id))
                    .set(credentials::last_used.eq(Some(now)))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use networth_core::credentials::{
        ApiKeyCredential, BasicAuthCredential, CredentialData, CredentialManager, CredentialStore,
        CredentialType,
    };
    use networth_core::crypto::EncryptionService;
    use tempfile::tempdir;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

    /// Returns the repository and the temp dir (to keep it alive).
    async fn create_test_repository() -> (Arc<CredentialRepository>, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = create_pool(&db_path_str).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        (
            Arc::new(CredentialRepository::new(Arc::clone(&pool), writer)),
            temp_dir,
        )
    }

    fn new_credential(service_type: ServiceType, payload: &str) -> NewCredential {
        NewCredential {
            service_type,
            credential_type: CredentialType::ApiKey,
            name: format!("{} key", service_type),
            encrypted_data: payload.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_active() {
        let (repo, _temp_dir) = create_test_repository().await;

        let inserted = repo
            .insert_if_absent(new_credential(ServiceType::Plaid, "cipher-1"))
            .await
            .unwrap();
        assert!(inserted.id > 0);
        assert!(inserted.is_active);
        assert_eq!(inserted.last_used, None);
        assert_eq!(inserted.created_at, inserted.updated_at);

        let fetched = repo.get_active(ServiceType::Plaid).unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert!(repo.get_active(ServiceType::Kraken).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_active_insert_is_rejected() {
        let (repo, _temp_dir) = create_test_repository().await;

        repo.insert_if_absent(new_credential(ServiceType::Kraken, "a"))
            .await
            .unwrap();
        let err = repo
            .insert_if_absent(new_credential(ServiceType::Kraken, "b"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Credential(CredentialError::AlreadyExists(ServiceType::Kraken))
        ));
        assert_eq!(repo.list_active().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_leave_one_active_row() {
        let (repo, _temp_dir) = create_test_repository().await;

        let first = repo.insert_if_absent(new_credential(ServiceType::Fidelity, "a"));
        let second = repo.insert_if_absent(new_credential(ServiceType::Fidelity, "b"));
        let (first, second) = tokio::join!(first, second);

        assert_eq!(
            [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
            1
        );
        assert_eq!(repo.list_active().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deactivate_then_insert_again() {
        let (repo, _temp_dir) = create_test_repository().await;

        let old = repo
            .insert_if_absent(new_credential(ServiceType::AllyInvest, "old"))
            .await
            .unwrap();
        assert_eq!(repo.deactivate(ServiceType::AllyInvest).await.unwrap(), 1);
        assert_eq!(repo.deactivate(ServiceType::AllyInvest).await.unwrap(), 0);
        assert!(repo.get_active(ServiceType::AllyInvest).unwrap().is_none());

        let new = repo
            .insert_if_absent(new_credential(ServiceType::AllyInvest, "new"))
            .await
            .unwrap();
        assert_ne!(new.id, old.id);
        assert_eq!(
            repo.get_active(ServiceType::AllyInvest)
                .unwrap()
                .unwrap()
                .encrypted_data,
            "new"
        );
    }

    #[tokio::test]
    async fn test_update_payload_only_touches_active_row() {
        let (repo, _temp_dir) = create_test_repository().await;

        assert!(repo
            .update_payload(42, "x".to_string())
            .await
            .unwrap()
            .is_none());

        let inserted = repo
            .insert_if_absent(new_credential(ServiceType::Plaid, "before"))
            .await
            .unwrap();
        let updated = repo
            .update_payload(inserted.id, "after".to_string())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.encrypted_data, "after");
        assert_eq!(updated.created_at, inserted.created_at);
        assert!(updated.updated_at >= inserted.updated_at);
    }

    #[tokio::test]
    async fn test_update_payload_skips_replaced_row() {
        let (repo, _temp_dir) = create_test_repository().await;

        let old = repo
            .insert_if_absent(new_credential(ServiceType::Fidelity, "old"))
            .await
            .unwrap();
        repo.deactivate(ServiceType::Fidelity).await.unwrap();
        let replacement = repo
            .insert_if_absent(NewCredential {
                credential_type: CredentialType::BasicAuth,
                ..new_credential(ServiceType::Fidelity, "replacement")
            })
            .await
            .unwrap();

        assert!(repo
            .update_payload(old.id, "late write".to_string())
            .await
            .unwrap()
            .is_none());

        let active = repo.get_active(ServiceType::Fidelity).unwrap().unwrap();
        assert_eq!(active.id, replacement.id);
        assert_eq!(active.credential_type, CredentialType::BasicAuth);
        assert_eq!(active.encrypted_data, "replacement");
    }

    #[tokio::test]
    async fn test_touch_last_used() {
        let (repo, _temp_dir) = create_test_repository().await;

        let inserted = repo
            .insert_if_absent(new_credential(ServiceType::MarketData, "k"))
            .await
            .unwrap();
        repo.touch_last_used(inserted.id).await.unwrap();

        let fetched = repo.get_active(ServiceType::MarketData).unwrap().unwrap();
        assert!(fetched.last_used.is_some());
    }

    #[tokio::test]
    async fn test_list_active_is_ordered_by_service() {
        let (repo, _temp_dir) = create_test_repository().await;

        for service in [ServiceType::Plaid, ServiceType::Kraken, ServiceType::AllyInvest] {
            repo.insert_if_absent(new_credential(service, "k"))
                .await
                .unwrap();
        }
        repo.deactivate(ServiceType::Kraken).await.unwrap();

        let services: Vec<_> = repo
            .list_active()
            .unwrap()
            .into_iter()
            .map(|c| c.service_type)
            .collect();
        assert_eq!(services, vec![ServiceType::AllyInvest, ServiceType::Plaid]);
    }

    #[tokio::test]
    async fn test_manager_round_trip_through_sqlite() {
        let (repo, _temp_dir) = create_test_repository().await;
        let encryption = Arc::new(EncryptionService::new(TEST_KEY).unwrap());
        let store = Arc::new(CredentialStore::new(repo.clone(), encryption));
        let manager = CredentialManager::new(store);

        manager
            .store_basic_auth(
                ServiceType::MorganStanley,
                "Brokerage login",
                BasicAuthCredential {
                    username: "alice".to_string(),
                    password: "hunter2".to_string(),
                    domain: None,
                },
            )
            .await
            .unwrap();

        let stored = repo.get_active(ServiceType::MorganStanley).unwrap().unwrap();
        assert!(!stored.encrypted_data.contains("hunter2"));

        let login = manager
            .get_basic_auth(ServiceType::MorganStanley)
            .await
            .unwrap();
        assert_eq!(login.username, "alice");
        assert_eq!(login.password, "hunter2");

        manager
            .update_credential(
                ServiceType::MorganStanley,
                CredentialData::BasicAuth(BasicAuthCredential {
                    username: "alice".to_string(),
                    password: "correct horse".to_string(),
                    domain: None,
                }),
            )
            .await
            .unwrap();
        assert_eq!(
            manager
                .get_basic_auth(ServiceType::MorganStanley)
                .await
                .unwrap()
                .password,
            "correct horse"
        );

        let err = manager
            .store_credential(
                ServiceType::MorganStanley,
                "Another",
                CredentialData::ApiKey(ApiKeyCredential {
                    key: "k".to_string(),
                    secret: None,
                    environment: None,
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Credential(CredentialError::AlreadyExists(ServiceType::MorganStanley))
        ));
    }
}
