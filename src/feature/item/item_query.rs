//! Search, sort and pagination of item listings.

use crate::{feature::item::item_repository::Item, infra::pagination::Pagination};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::{IntoParams, ToSchema};

/// Raw listing parameters, as sent in the query string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Case-insensitive text to look for in titles and descriptions.
    pub q: Option<String>,
    /// The 1-indexed page to fetch.
    pub page: Option<i64>,
    /// The number of items per page, at most 100.
    pub limit: Option<i64>,
    /// The field to sort by.
    pub sort_field: Option<SortField>,
    /// The sort direction.
    pub sort_dir: Option<SortDirection>,
}

/// Fields items can be sorted by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// When the item was created.
    #[default]
    CreatedAt,
    /// When the item was last changed.
    UpdatedAt,
    /// The item's title.
    Title,
}

impl SortField {
    /// The column holding this field.
    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
        }
    }

    /// Orders two items by this field, ascending.
    pub fn compare(self, a: &Item, b: &Item) -> Ordering {
        match self {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.cmp(&b.title),
        }
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortDirection {
    /// The SQL keyword for this direction.
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Applies this direction to an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// A case-insensitive substring match on title or description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemFilter {
    text: String,
    lowercase: String,
}

impl ItemFilter {
    /// A filter for `text`, or `None` if it is blank and would match anything.
    pub fn new(text: &str) -> Option<Self> {
        let text = text.trim();
        (!text.is_empty()).then(|| Self {
            text: text.to_string(),
            lowercase: text.to_lowercase(),
        })
    }

    /// The text being searched for.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the item's title or description contains the text.
    pub fn matches(&self, item: &Item) -> bool {
        item.title.to_lowercase().contains(&self.lowercase)
            || item
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&self.lowercase))
    }

    /// A `LIKE` pattern matching the text literally anywhere in a value.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.text.len() + 2);
        pattern.push('%');
        for c in self.text.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

/// A validated listing request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Only items matching this filter are listed.
    pub filter: Option<ItemFilter>,
    /// Which page to return.
    pub pagination: Pagination,
    /// The field to sort by.
    pub sort_field: SortField,
    /// The sort direction.
    pub sort_direction: SortDirection,
}

impl From<ListParams> for ListQuery {
    fn from(params: ListParams) -> Self {
        Self {
            filter: params.q.as_deref().and_then(ItemFilter::new),
            pagination: Pagination::new(params.page, params.limit),
            sort_field: params.sort_field.unwrap_or_default(),
            sort_direction: params.sort_dir.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn item(title: &str, description: Option<&str>) -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.map(str::to_string),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn filter_is_case_insensitive() {
        let filter = ItemFilter::new("red").unwrap();
        assert!(filter.matches(&item("Red Mug", None)));
        assert!(filter.matches(&item("Mug", Some("A deep RED glaze"))));
        assert!(!filter.matches(&item("Blue Mug", Some("ceramic"))));
    }

    #[test]
    fn blank_filter_matches_everything() {
        assert_eq!(None, ItemFilter::new(""));
        assert_eq!(None, ItemFilter::new("   "));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let filter = ItemFilter::new("100%_off\\").unwrap();
        assert_eq!(r"%100\%\_off\\%", filter.like_pattern());
    }

    #[test]
    fn params_are_normalized() {
        let query = ListQuery::from(ListParams {
            q: Some("  mug ".to_string()),
            page: Some(0),
            limit: Some(500),
            sort_field: Some(SortField::Title),
            sort_dir: None,
        });
        assert_eq!("mug", query.filter.unwrap().text());
        assert_eq!(Pagination::new(Some(1), Some(100)), query.pagination);
        assert_eq!(SortField::Title, query.sort_field);
        assert_eq!(SortDirection::Desc, query.sort_direction);
    }

    #[test]
    fn query_string_uses_camel_case() {
        let params: ListParams =
            serde_json::from_str(r#"{"sortField": "updatedAt", "sortDir": "asc", "page": 3}"#)
                .unwrap();
        assert_eq!(Some(SortField::UpdatedAt), params.sort_field);
        assert_eq!(Some(SortDirection::Asc), params.sort_dir);
        assert_eq!(Some(3), params.page);
    }
}
