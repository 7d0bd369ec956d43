//! Pagination types shared by collection list endpoints

use serde::{Deserialize, Serialize};

/// Upper bound on a single page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub limit: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamped to sane bounds
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Documents in the current page
    pub docs: Vec<T>,
    /// Total number of matching documents
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Number of pages
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    pub fn new(docs: Vec<T>, total: i64, params: &ListParams) -> Self {
        let total_pages = if params.limit == 0 {
            0
        } else {
            let total = u32::try_from(total.max(0)).unwrap_or(u32::MAX);
            total.div_ceil(params.limit)
        };

        Self {
            docs,
            total,
            page: params.page,
            limit: params.limit,
            total_pages,
        }
    }

    /// Transform the documents while keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            docs: self.docs.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}
