use std::sync::Arc;

use crate::config::{Config, LogFormat};
use networth_core::credentials::{CredentialManager, CredentialStore};
use networth_core::crypto::EncryptionService;
use networth_core::prices::{PriceRefreshService, PriceRefreshServiceTrait, PriceSources};
use networth_market_data::{BudgetTracker, ALPHA_VANTAGE_ID, TWELVE_DATA_ID};
use networth_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, CredentialRepository, PriceCacheRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub credential_manager: Arc<CredentialManager>,
    pub price_service: Arc<dyn PriceRefreshServiceTrait>,
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = create_pool(&db_path)?;
    run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());

    let encryption = Arc::new(EncryptionService::new(&config.encryption_key)?);
    let credential_repository = Arc::new(CredentialRepository::new(pool.clone(), writer.clone()));
    let credential_store = Arc::new(CredentialStore::new(credential_repository, encryption));
    let credential_manager = Arc::new(CredentialManager::new(credential_store));

    let budgets = Arc::new(BudgetTracker::default());
    budgets.configure(TWELVE_DATA_ID, config.twelve_data.budget);
    budgets.configure(ALPHA_VANTAGE_ID, config.alpha_vantage.budget);

    let sources = PriceSources::from_api_keys(
        config.twelve_data.api_key.clone(),
        config.alpha_vantage.api_key.clone(),
    );
    tracing::info!(
        "Price sources: {}",
        if sources.is_development() {
            "mock (development)"
        } else {
            "live"
        }
    );

    let price_repository = Arc::new(PriceCacheRepository::new(pool, writer));
    let price_service = Arc::new(PriceRefreshService::new(
        price_repository,
        sources,
        budgets,
        config.freshness_policy(),
    ));

    Ok(Arc::new(AppState {
        credential_manager,
        price_service,
    }))
}
