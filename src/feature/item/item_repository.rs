//! Types and functions for storing and loading items from the database.

use crate::{
    feature::{
        asset::asset_store::AssetRef,
        item::{
            item_error::{ItemError, ItemResult},
            item_query::{ItemFilter, ListQuery},
        },
    },
    infra::{database::DbPool, validation::Valid},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use tracing::{instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A new item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewItem {
    /// The item's title.
    #[validate(custom(function = "not_blank", message = "title is required"))]
    pub title: String,
    /// The item's description.
    pub description: Option<String>,
}

/// Titles need at least one non-whitespace character.
fn not_blank(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Changes to an existing item. Fields left out keep their value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ItemChanges {
    /// The new title.
    #[validate(custom(function = "not_blank", message = "title must not be empty"))]
    pub title: Option<String>,
    /// The new description.
    pub description: Option<String>,
}

/// An existing item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// The item's id.
    pub id: Uuid,
    /// The item's title.
    #[schema(example = "Mug")]
    pub title: String,
    /// The item's description.
    #[schema(example = "Blue ceramic mug")]
    pub description: Option<String>,
    /// Where the item's image is served, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "/uploads/1700000000000-9f86d081884c7d65.jpg")]
    pub image: Option<AssetRef>,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
    /// When the item was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Anything that can store items.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    /// Creates a new item.
    async fn create(&self, new_item: NewItem, image: Option<AssetRef>) -> ItemResult<Item>;

    /// Fetches an item.
    async fn fetch(&self, id: Uuid) -> ItemResult<Item>;

    /// Lists one page of matching items, and how many match in total.
    async fn list(&self, query: &ListQuery) -> ItemResult<(Vec<Item>, i64)>;

    /// Applies changes to an item. A new image replaces the old reference.
    async fn update(
        &self,
        id: Uuid,
        changes: ItemChanges,
        image: Option<AssetRef>,
    ) -> ItemResult<Item>;

    /// Deletes an item, returning what was deleted.
    async fn delete(&self, id: Uuid) -> ItemResult<Item>;
}

/// An item store backed by Postgres.
#[derive(Clone, Debug)]
pub struct PgItemStore {
    db: DbPool,
}

impl PgItemStore {
    /// Creates a new store on a connection pool.
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

/// Restricts a query to items matching the filter.
fn push_filter<'a>(query: &mut QueryBuilder<'a, Postgres>, filter: Option<&ItemFilter>) {
    if let Some(filter) = filter {
        let pattern = filter.like_pattern();
        query
            .push(" WHERE title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern);
    }
}

#[async_trait::async_trait]
impl ItemStore for PgItemStore {
    #[instrument(skip(self))]
    async fn create(&self, new_item: NewItem, image: Option<AssetRef>) -> ItemResult<Item> {
        let new_item = Valid::new(new_item)?.into_inner();
        tracing::info!("Creating item {:?}", new_item);
        let item = sqlx::query_as::<_, Item>(
            r#"
                INSERT INTO items (id, title, description, image)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title, description, image, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_item.title)
        .bind(&new_item.description)
        .bind(&image)
        .fetch_one(&self.db)
        .await?;
        tracing::info!("Created item {:?}", item);
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, id: Uuid) -> ItemResult<Item> {
        tracing::info!("Reading item");
        let item = sqlx::query_as::<_, Item>(
            r#"
                SELECT id, title, description, image, created_at, updated_at
                FROM items
                WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .instrument(tracing::info_span!("fetch_optional"))
        .await?;
        tracing::info!("Found item: {:?}", item);
        item.ok_or(ItemError::NotFound)
    }

    #[instrument(skip(self))]
    async fn list(&self, query: &ListQuery) -> ItemResult<(Vec<Item>, i64)> {
        tracing::info!("Listing items");
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items");
        push_filter(&mut count, query.filter.as_ref());
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .instrument(tracing::info_span!("count"))
            .await?;

        let direction = query.sort_direction.keyword();
        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT id, title, description, image, created_at, updated_at FROM items",
        );
        push_filter(&mut select, query.filter.as_ref());
        select
            .push(format!(
                " ORDER BY {} {direction}, id {direction} LIMIT ",
                query.sort_field.column()
            ))
            .push_bind(query.pagination.limit())
            .push(" OFFSET ")
            .push_bind(query.pagination.offset());
        let items = select
            .build_query_as::<Item>()
            .fetch_all(&self.db)
            .instrument(tracing::info_span!("fetch_all"))
            .await?;
        tracing::info!("Listed {} of {} items", items.len(), total);
        Ok((items, total))
    }

    #[instrument(skip(self))]
    async fn update(
        &self,
        id: Uuid,
        changes: ItemChanges,
        image: Option<AssetRef>,
    ) -> ItemResult<Item> {
        let changes = Valid::new(changes)?.into_inner();
        tracing::info!("Updating item");
        let item = sqlx::query_as::<_, Item>(
            r#"
                UPDATE items
                SET title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    image = COALESCE($4, image),
                    updated_at = now()
                WHERE id = $1
                RETURNING id, title, description, image, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&image)
        .fetch_optional(&self.db)
        .await?
        .ok_or(ItemError::NotFound)?;
        tracing::info!("Updated item {:?}", item);
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> ItemResult<Item> {
        tracing::info!("Deleting item");
        let item = sqlx::query_as::<_, Item>(
            r#"
                DELETE FROM items
                WHERE id = $1
                RETURNING id, title, description, image, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        let Some(item) = item else {
            tracing::warn!("Item not found");
            return Err(ItemError::NotFound);
        };

        tracing::info!("Deleted item");
        Ok(item)
    }
}
