//! The features of the application, one module per resource.

use crate::infra::state::AppState;
use axum::Router;

pub mod asset;
pub mod info;
pub mod item;

/// Constructs the full REST API.
pub fn api(state: AppState) -> Router {
    let max_upload_bytes = state.config().uploads.max_upload_bytes;
    Router::new()
        .merge(info::info_api::routes())
        .merge(item::item_api::routes(max_upload_bytes))
        .with_state(state)
}
