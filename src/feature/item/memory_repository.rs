//! An item store that lives in memory, for development and tests.

use crate::{
    feature::{
        asset::asset_store::AssetRef,
        item::{
            item_error::{ItemError, ItemResult},
            item_query::ListQuery,
            item_repository::{Item, ItemChanges, ItemStore, NewItem},
        },
    },
    infra::validation::Valid,
};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

/// Items kept in insertion order, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: RwLock<Vec<Item>>,
}

impl MemoryItemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ItemStore for MemoryItemStore {
    #[instrument(skip(self))]
    async fn create(&self, new_item: NewItem, image: Option<AssetRef>) -> ItemResult<Item> {
        let new_item = Valid::new(new_item)?.into_inner();
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            title: new_item.title,
            description: new_item.description,
            image,
            created_at: now,
            updated_at: now,
        };
        self.items.write().await.push(item.clone());
        tracing::info!("Created item {:?}", item);
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, id: Uuid) -> ItemResult<Item> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or(ItemError::NotFound)
    }

    #[instrument(skip(self))]
    async fn list(&self, query: &ListQuery) -> ItemResult<(Vec<Item>, i64)> {
        let items = self.items.read().await;
        let mut matching: Vec<&Item> = items
            .iter()
            .filter(|item| query.filter.as_ref().map_or(true, |f| f.matches(item)))
            .collect();
        let total = matching.len() as i64;

        // Stable, so equal keys stay in insertion order.
        matching.sort_by(|a, b| {
            query
                .sort_direction
                .apply(query.sort_field.compare(a, b))
        });

        let page = matching
            .into_iter()
            .skip(usize::try_from(query.pagination.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(query.pagination.limit()).unwrap_or(0))
            .cloned()
            .collect::<Vec<_>>();
        tracing::info!("Listed {} of {} items", page.len(), total);
        Ok((page, total))
    }

    #[instrument(skip(self))]
    async fn update(
        &self,
        id: Uuid,
        changes: ItemChanges,
        image: Option<AssetRef>,
    ) -> ItemResult<Item> {
        let changes = Valid::new(changes)?.into_inner();
        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(ItemError::NotFound)?;
        if let Some(title) = changes.title {
            item.title = title;
        }
        if let Some(description) = changes.description {
            item.description = Some(description);
        }
        if image.is_some() {
            item.image = image;
        }
        item.updated_at = Utc::now();
        tracing::info!("Updated item {:?}", item);
        Ok(item.clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> ItemResult<Item> {
        let mut items = self.items.write().await;
        let Some(index) = items.iter().position(|item| item.id == id) else {
            tracing::warn!("Item not found");
            return Err(ItemError::NotFound);
        };
        let item = items.remove(index);
        tracing::info!("Deleted item");
        Ok(item)
    }
}
