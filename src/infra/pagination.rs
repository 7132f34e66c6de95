//! Page-based pagination.
//!
//! ```
//! use item_catalog::infra::pagination::Pagination;
//!
//! let pagination = Pagination::new(Some(2), Some(10));
//! assert_eq!(10, pagination.offset());
//! assert_eq!(Pagination::new(Some(1), Some(100)), Pagination::new(Some(0), Some(5000)));
//! ```

use serde::Serialize;

/// The page size used when none is requested.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// The largest page size a client may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A normalized page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    page: i64,
    limit: i64,
}

impl Pagination {
    /// Normalizes raw page parameters.
    ///
    /// Pages start at 1. A missing or non-positive limit falls back to
    /// [`DEFAULT_PAGE_SIZE`], and limits are capped at [`MAX_PAGE_SIZE`].
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = match limit {
            Some(limit) if limit >= 1 => limit.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };
        Self { page, limit }
    }

    /// The 1-indexed page.
    pub fn page(&self) -> i64 {
        self.page
    }

    /// The number of elements per page.
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// How many elements precede this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}
