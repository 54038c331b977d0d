//! Pagination extractor.
//!
//! Reads `offset` and `limit` from the query string. A missing limit uses
//! the configured default page size; any limit is clamped to the maximum.

use atrium_persistence::types::Pagination;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use crate::error::RestError;
use crate::state::AppState;

/// Listing pagination taken from the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams(pub Pagination);

#[derive(Debug, Deserialize)]
struct PageQuery {
    offset: Option<u32>,
    limit: Option<u32>,
}

impl PageParams {
    fn from_query(query: PageQuery, default_limit: u32, max_limit: u32) -> Self {
        let pagination = Pagination::new(
            query.offset.unwrap_or(0),
            query.limit.unwrap_or(default_limit),
        );
        PageParams(pagination.clamped(max_limit))
    }
}

impl FromRequestParts<AppState> for PageParams {
    type Rejection = RestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PageQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| RestError::BadRequest {
                message: format!("Invalid pagination parameters: {}", e.body_text()),
            })?;

        let config = state.config();
        Ok(Self::from_query(
            query,
            config.default_page_size,
            config.max_page_size,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let PageParams(page) = PageParams::from_query(
            PageQuery {
                offset: None,
                limit: None,
            },
            20,
            100,
        );
        assert_eq!(page, Pagination::new(0, 20));
    }

    #[test]
    fn test_limit_clamped() {
        let PageParams(page) = PageParams::from_query(
            PageQuery {
                offset: Some(40),
                limit: Some(5000),
            },
            20,
            100,
        );
        assert_eq!(page, Pagination::new(40, 100));

        let PageParams(page) = PageParams::from_query(
            PageQuery {
                offset: None,
                limit: Some(0),
            },
            20,
            100,
        );
        assert_eq!(page.limit, 1);
    }
}
