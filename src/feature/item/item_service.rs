//! A service for interacting with items and their images.
//!
//! The service keeps an item's `image` pointing at a stored asset: new assets
//! are stored before the record that references them is written, and old
//! assets are removed only after the record stops referencing them. The two
//! writes are not atomic. When the record write fails after an asset was
//! stored, or an old asset cannot be removed, the asset is left behind and
//! logged as orphaned.

use crate::{
    feature::{
        asset::asset_store::{AssetRef, AssetStore, Upload},
        item::{
            item_error::ItemResult,
            item_query::ListQuery,
            item_repository::{Item, ItemChanges, ItemStore, NewItem},
        },
    },
    infra::validation::Valid,
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// One page of a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemPage {
    /// The items on this page.
    pub items: Vec<Item>,
    /// How many items match in total.
    pub total: i64,
    /// The 1-indexed page.
    pub page: i64,
    /// The page size used.
    pub limit: i64,
}

/// Item operations on top of an item store and an asset store.
#[derive(Clone)]
pub struct ItemService {
    items: Arc<dyn ItemStore>,
    assets: Arc<dyn AssetStore>,
}

impl fmt::Debug for ItemService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemService").finish_non_exhaustive()
    }
}

impl ItemService {
    /// Creates a new service.
    pub fn new(items: Arc<dyn ItemStore>, assets: Arc<dyn AssetStore>) -> Self {
        Self { items, assets }
    }

    /// Creates an item, storing its image first if there is one.
    #[instrument(skip(self, upload))]
    pub async fn create_item(&self, new_item: NewItem, upload: Option<Upload>) -> ItemResult<Item> {
        let new_item = Valid::new(new_item)?.into_inner();
        let image = match upload {
            Some(upload) => Some(self.assets.store(upload).await?),
            None => None,
        };
        let result = self.items.create(new_item, image.clone()).await;
        if let (Err(e), Some(asset)) = (&result, &image) {
            tracing::warn!(%asset, "Item not created, asset is orphaned: {}", e);
        }
        result
    }

    /// Reads an item.
    #[instrument(skip(self))]
    pub async fn read_item(&self, id: Uuid) -> ItemResult<Item> {
        self.items.fetch(id).await
    }

    /// Lists a page of items.
    #[instrument(skip(self))]
    pub async fn list_items(&self, query: ListQuery) -> ItemResult<ItemPage> {
        let (items, total) = self.items.list(&query).await?;
        Ok(ItemPage {
            items,
            total,
            page: query.pagination.page(),
            limit: query.pagination.limit(),
        })
    }

    /// Updates an item. A new upload replaces the item's image, and the
    /// previous image is removed once the item no longer references it.
    #[instrument(skip(self, upload))]
    pub async fn update_item(
        &self,
        id: Uuid,
        changes: ItemChanges,
        upload: Option<Upload>,
    ) -> ItemResult<Item> {
        let changes = Valid::new(changes)?.into_inner();
        let existing = self.items.fetch(id).await?;

        let Some(upload) = upload else {
            return self.items.update(id, changes, None).await;
        };

        let image = self.assets.store(upload).await?;
        let item = match self.items.update(id, changes, Some(image.clone())).await {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(asset = %image, "Item not updated, asset is orphaned: {}", e);
                return Err(e);
            }
        };
        if let Some(previous) = existing.image {
            self.discard(&previous).await;
        }
        Ok(item)
    }

    /// Deletes an item and then its image.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: Uuid) -> ItemResult<Item> {
        let item = self.items.delete(id).await?;
        if let Some(image) = &item.image {
            self.discard(image).await;
        }
        Ok(item)
    }

    /// Removes an asset no item references anymore.
    /// A stale reference is skipped, and failures only leave an orphan.
    async fn discard(&self, asset: &AssetRef) {
        if !self.assets.exists(asset).await {
            tracing::debug!(%asset, "Asset already gone");
            return;
        }
        if let Err(e) = self.assets.remove(asset).await {
            tracing::warn!(%asset, "Failed to remove asset, it is orphaned: {}", e);
        }
    }
}
