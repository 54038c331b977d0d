//! Shared value types.

mod pagination;

pub use pagination::{DEFAULT_PAGE_SIZE, Page, Pagination};
