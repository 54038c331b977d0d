//! Offset pagination for entity listings.

use serde::{Deserialize, Serialize};

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Offset pagination for a listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Number of records to skip.
    pub offset: u32,
    /// Maximum number of records to return.
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Creates pagination with the given offset and limit.
    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }

    /// Clamps the limit into `1..=max`.
    pub fn clamped(self, max: u32) -> Self {
        Self {
            offset: self.offset,
            limit: self.limit.clamp(1, max.max(1)),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Records on this page.
    pub items: Vec<T>,
    /// Total records matching the scope.
    pub total: u64,
    /// Offset this page starts at.
    pub offset: u32,
    /// Requested page size.
    pub limit: u32,
    /// Whether more records follow this page.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Builds a page and derives `has_more`.
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        let has_more = u64::from(pagination.offset) + (items.len() as u64) < total;
        Self {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
            has_more,
        }
    }
}
