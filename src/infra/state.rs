//! Global application state.
//!
//! Used for access to common resources such as the item service
//! or the loaded configuration.

use super::config::Config;
use crate::feature::item::item_service::ItemService;
use axum::extract::FromRef;
use std::sync::Arc;

/// Global application state.
#[derive(Clone, Debug, FromRef)]
pub struct AppState {
    items: ItemService,
    config: Arc<Config>,
}

impl AppState {
    /// Constructs a new [`AppState`].
    pub fn new(items: ItemService, config: Config) -> Self {
        Self {
            items,
            config: Arc::new(config),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
