//! Limit/offset pagination.

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// A validated `(limit, offset)` pair.
///
/// Both values are non-negative; construction is the only place that is
/// checked, so the store can take them verbatim.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    limit: i64,
    offset: i64,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> CatalogResult<Self> {
        if limit < 0 {
            return Err(CatalogError::validation(format!(
                "limit must be non-negative, got {limit}"
            ))
            .with_context("param", "limit"));
        }
        if offset < 0 {
            return Err(CatalogError::validation(format!(
                "offset must be non-negative, got {offset}"
            ))
            .with_context("param", "offset"));
        }
        Ok(Self { limit, offset })
    }

    /// Everything from the first row on.
    pub fn all() -> Self {
        Self {
            limit: i64::MAX,
            offset: 0,
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Apply the window to an already ordered iterator (in-memory stores).
    pub fn apply<I: IntoIterator>(&self, items: I) -> Vec<I::Item> {
        let skip = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(take).collect()
    }
}
