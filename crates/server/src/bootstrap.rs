use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use encore_core::config::{AppConfig, ConfigError, LoadOptions};
use encore_core::games::{GameCatalog, GamesError};
use encore_discord::messenger::{Messenger, NoopMessenger};
use encore_store::{JsonFileMappingStore, MappingService, StoreError};

pub struct Application {
    pub config: AppConfig,
    pub mapping: Arc<MappingService>,
    pub catalog: Arc<GameCatalog>,
    pub messenger: Arc<dyn Messenger>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let store = Arc::new(JsonFileMappingStore::new(config.storage.mapping_path.clone()));
    let mapping = Arc::new(MappingService::load(store).await?);
    info!(
        event_name = "system.bootstrap.mapping_loaded",
        correlation_id = "bootstrap",
        users = mapping.snapshot().await.user_count(),
        "user-to-source mapping loaded"
    );

    let catalog = Arc::new(load_catalog(&config));

    // Offline until a live Discord transport is wired in; the gateway and
    // messenger ports keep the rest of the system indifferent to that.
    if !config.has_bot_token() {
        info!(
            event_name = "system.bootstrap.offline_mode",
            correlation_id = "bootstrap",
            "no bot token configured; running with noop transport"
        );
    }
    let messenger: Arc<dyn Messenger> = Arc::new(NoopMessenger);

    Ok(Application { config, mapping, catalog, messenger })
}

/// A missing or unreadable board-game export leaves the catalog empty rather
/// than failing startup; the concert surface works without it.
fn load_catalog(config: &AppConfig) -> GameCatalog {
    match GameCatalog::load(&config.storage.board_games_path) {
        Ok(catalog) => {
            info!(
                event_name = "system.bootstrap.catalog_loaded",
                correlation_id = "bootstrap",
                games = catalog.len(),
                "board game catalog loaded"
            );
            catalog
        }
        Err(GamesError::Unavailable { path, detail }) => {
            warn!(
                event_name = "system.bootstrap.catalog_unavailable",
                correlation_id = "bootstrap",
                path = %path,
                detail = %detail,
                "board game catalog missing; games commands will be empty"
            );
            GameCatalog::default()
        }
        Err(GamesError::Malformed { path, detail }) => {
            warn!(
                event_name = "system.bootstrap.catalog_malformed",
                correlation_id = "bootstrap",
                path = %path,
                detail = %detail,
                "board game catalog unreadable; games commands will be empty"
            );
            GameCatalog::default()
        }
    }
}
