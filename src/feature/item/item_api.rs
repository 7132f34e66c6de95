//! The item API implementation.

use crate::{
    feature::{
        asset::asset_store::Upload,
        item::{
            item_query::{ListParams, ListQuery},
            item_repository::{Item, ItemChanges, NewItem},
            item_service::{ItemPage, ItemService},
        },
    },
    infra::{
        error::{ApiResult, ClientError, MessageBody},
        extract::{Form, MultipartForm, Query},
        state::AppState,
    },
};
use axum::{
    async_trait,
    extract::{DefaultBodyLimit, Multipart, State},
    Json, Router,
};
use axum_extra::routing::{RouterExt, TypedPath};
use http::StatusCode;
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// The item API endpoints.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .typed_get(list_items)
        .typed_post(create_item)
        .typed_get(get_item)
        .typed_put(update_item)
        .typed_delete(delete_item)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[derive(Deserialize, TypedPath)]
#[typed_path("/items", rejection(ClientError))]
pub struct Items;

#[derive(Deserialize, TypedPath)]
#[typed_path("/items/:id", rejection(ClientError))]
pub struct ItemsId(Uuid);

/// The multipart body of item creation and updates.
#[derive(Debug, Default, ToSchema)]
pub struct ItemForm {
    /// The item's title.
    #[schema(example = "Mug")]
    title: Option<String>,
    /// The item's description.
    #[schema(example = "Blue ceramic mug")]
    description: Option<String>,
    /// An image file.
    #[schema(value_type = Option<String>, format = Binary)]
    image: Option<Upload>,
}

#[async_trait]
impl MultipartForm for ItemForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ClientError> {
        let mut form = ItemForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("title") => form.title = Some(field.text().await?.trim().to_string()),
                Some("description") => form.description = Some(field.text().await?),
                Some("image") => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(str::to_owned);
                    let data = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen.
                    if !data.is_empty() {
                        form.image = Some(Upload {
                            file_name,
                            content_type,
                            data,
                        });
                    }
                }
                other => tracing::debug!(field = ?other, "Ignoring unknown form field"),
            }
        }
        Ok(form)
    }
}

impl ItemForm {
    fn into_new_item(self) -> (NewItem, Option<Upload>) {
        let new_item = NewItem {
            title: self.title.unwrap_or_default(),
            description: self.description,
        };
        (new_item, self.image)
    }

    fn into_changes(self) -> (ItemChanges, Option<Upload>) {
        let changes = ItemChanges {
            title: self.title,
            description: self.description,
        };
        (changes, self.image)
    }
}

/// Lists items, optionally filtered, sorted and paginated.
#[utoipa::path(
    get,
    path = "/api/items",
    params(ListParams),
    responses(
        (status = 200, description = "Success", body = ItemPage),
        (status = 400, description = "Bad Request", body = crate::infra::error::ErrorBody),
        (status = 500, description = "Internal Server Error", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip_all, fields(params = ?params))]
pub async fn list_items(
    Items: Items,
    State(items): State<ItemService>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ItemPage>> {
    let page = items.list_items(ListQuery::from(params)).await?;
    Ok(Json(page))
}

/// Creates a new item.
#[utoipa::path(
    post,
    path = "/api/items",
    request_body(content = ItemForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created", body = Item),
        (status = 400, description = "Bad Request", body = crate::infra::error::ErrorBody),
        (status = 413, description = "Payload Too Large", body = crate::infra::error::ErrorBody),
        (status = 500, description = "Internal Server Error", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip_all)]
pub async fn create_item(
    Items: Items,
    State(items): State<ItemService>,
    Form(form): Form<ItemForm>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    let (new_item, upload) = form.into_new_item();
    let item = items.create_item(new_item, upload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Gets an item.
#[utoipa::path(
    get,
    path = "/api/items/{id}",
    params(("id" = Uuid, Path, description = "The item's id")),
    responses(
        (status = 200, description = "Ok", body = Item),
        (status = 404, description = "Not Found", body = crate::infra::error::ErrorBody),
        (status = 500, description = "Internal Server Error", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip_all, fields(%id))]
pub async fn get_item(
    ItemsId(id): ItemsId,
    State(items): State<ItemService>,
) -> ApiResult<Json<Item>> {
    let item = items.read_item(id).await?;
    Ok(Json(item))
}

/// Updates an item. Fields left out keep their value, and a new image
/// replaces the old one.
#[utoipa::path(
    put,
    path = "/api/items/{id}",
    params(("id" = Uuid, Path, description = "The item's id")),
    request_body(content = ItemForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Ok", body = Item),
        (status = 400, description = "Bad Request", body = crate::infra::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::infra::error::ErrorBody),
        (status = 500, description = "Internal Server Error", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip_all, fields(%id))]
pub async fn update_item(
    ItemsId(id): ItemsId,
    State(items): State<ItemService>,
    Form(form): Form<ItemForm>,
) -> ApiResult<Json<Item>> {
    let (changes, upload) = form.into_changes();
    let item = items.update_item(id, changes, upload).await?;
    Ok(Json(item))
}

/// Deletes an item and its image.
#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    params(("id" = Uuid, Path, description = "The item's id")),
    responses(
        (status = 200, description = "Ok", body = MessageBody),
        (status = 404, description = "Not Found", body = crate::infra::error::ErrorBody),
        (status = 500, description = "Internal Server Error", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip_all, fields(%id))]
pub async fn delete_item(
    ItemsId(id): ItemsId,
    State(items): State<ItemService>,
) -> ApiResult<Json<MessageBody>> {
    items.delete_item(id).await?;
    Ok(Json(MessageBody {
        message: "Item deleted successfully".to_string(),
    }))
}
