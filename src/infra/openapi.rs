//! OpenAPI configuration.

use crate::feature::{
    info::info_api,
    item::{item_api, item_query, item_repository, item_service},
};
use utoipa::OpenApi;

/// OpenApi configuration.
#[derive(OpenApi)]
#[openapi(
    info(title = "Item catalog"),
    paths(
        info_api::info,
        item_api::list_items,
        item_api::create_item,
        item_api::get_item,
        item_api::update_item,
        item_api::delete_item,
    ),
    components(
        schemas(
            info_api::AppInfo,
            item_api::ItemForm,
            item_repository::Item,
            item_service::ItemPage,
            item_query::SortField,
            item_query::SortDirection,
            crate::infra::error::ErrorBody,
            crate::infra::error::MessageBody,
        )
    )
)]
#[derive(Clone, Copy, Debug)]
pub struct ApiDoc;
