use std::sync::Arc;

use orderbot_agent::{
    default_registry, IntentClassifier, KeywordClassifier, LuisClassifier, RuntimeSettings,
    TurnProcessor, TurnRouter,
};
use orderbot_core::catalog::{CatalogError, MenuCatalog};
use orderbot_core::config::{AppConfig, ClassifierProvider, StorageBackend};
use orderbot_core::store::ConversationStore;
use orderbot_db::{
    connect_with_settings, migrations, DbPool, InMemoryConversationStore, SqlConversationStore,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub catalog_size: usize,
    pub db_pool: Option<DbPool>,
    pub processor: Arc<TurnProcessor>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("menu catalog failed to load: {0}")]
    Catalog(#[from] CatalogError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let catalog = MenuCatalog::load(&config.catalog.path)?;
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        path = %config.catalog.path.display(),
        items = catalog.len(),
        "menu catalog loaded"
    );

    assemble(config, catalog).await
}

/// Wires storage, classifier and dialogs around an already loaded catalog.
pub async fn assemble(config: AppConfig, catalog: MenuCatalog) -> Result<Application, BootstrapError> {
    let catalog_size = catalog.len();
    let (store, db_pool) = open_store(&config).await?;
    let classifier = build_classifier(&config, &catalog)?;

    let processor = TurnProcessor::new(
        classifier,
        store,
        TurnRouter::new(default_registry(catalog, &config.replies)),
        RuntimeSettings::from(&config),
    );
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        classifier = processor.classifier_name(),
        storage = ?config.storage.backend,
        "turn runtime initialized"
    );

    Ok(Application { config, catalog_size, db_pool, processor: Arc::new(processor) })
}

async fn open_store(
    config: &AppConfig,
) -> Result<(Arc<dyn ConversationStore>, Option<DbPool>), BootstrapError> {
    match config.storage.backend {
        StorageBackend::Memory => Ok((Arc::new(InMemoryConversationStore::default()), None)),
        StorageBackend::Sqlite => {
            let db_pool = connect_with_settings(
                &config.storage.url,
                config.storage.max_connections,
                config.storage.timeout_secs,
            )
            .await
            .map_err(BootstrapError::DatabaseConnect)?;
            info!(
                event_name = "system.bootstrap.database_connected",
                correlation_id = "bootstrap",
                "database connection established"
            );

            migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
            info!(
                event_name = "system.bootstrap.migrations_applied",
                correlation_id = "bootstrap",
                "database migrations applied"
            );

            Ok((Arc::new(SqlConversationStore::new(db_pool.clone())), Some(db_pool)))
        }
    }
}

fn build_classifier(
    config: &AppConfig,
    catalog: &MenuCatalog,
) -> Result<Arc<dyn IntentClassifier>, BootstrapError> {
    match config.classifier.provider {
        ClassifierProvider::Keyword => Ok(Arc::new(KeywordClassifier::new(catalog))),
        ClassifierProvider::Luis => {
            let endpoint = config.classifier.endpoint.clone().ok_or_else(|| {
                BootstrapError::Configuration(
                    "classifier.endpoint is required when classifier.provider = luis".to_owned(),
                )
            })?;
            Ok(Arc::new(LuisClassifier::new(endpoint, config.classifier.min_confidence)))
        }
    }
}
