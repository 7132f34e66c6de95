//! Serves the item catalog.

use item_catalog::{
    app::run_app,
    feature::{
        asset::local_store::LocalAssetStore,
        item::{
            item_repository::{ItemStore, PgItemStore},
            item_service::ItemService,
            memory_repository::MemoryItemStore,
        },
    },
    infra::{config, database, logging, state::AppState},
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let config = config::load_config()?;
    let _guard = logging::init_logging(&config.logging);

    let items: Arc<dyn ItemStore> = match &config.database.url {
        Some(url) => {
            let db = database::init_db(url, &config.database)?;
            database::migrate(&db).await?;
            Arc::new(PgItemStore::new(db))
        }
        None => {
            tracing::warn!("No database configured, items are kept in memory");
            Arc::new(MemoryItemStore::new())
        }
    };
    let assets = LocalAssetStore::open(&config.uploads).await?;
    let service = ItemService::new(items, Arc::new(assets));

    let listener = TcpListener::bind((config.server.address.as_str(), config.server.port)).await?;
    run_app(listener, AppState::new(service, config)).await?;

    Ok(())
}
