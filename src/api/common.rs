//! Common API utilities and shared types

use axum::extract::{rejection::QueryRejection, Query};
use serde::Deserialize;

use crate::api::context::{PageError, SiteContext};
use crate::api::middleware::ApiError;
use crate::config::BlogConfig;
use crate::models::ListParams;

/// Pagination query parameters. A missing page size falls back to the
/// configured one.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PaginationQuery {
    /// List parameters from an extracted query. A malformed query string
    /// becomes a validation error page that still carries the tag list.
    pub fn params_or_error(
        query: Result<Query<Self>, QueryRejection>,
        site: &SiteContext,
        blog: &BlogConfig,
    ) -> Result<ListParams, PageError> {
        match query {
            Ok(Query(query)) => Ok(query.to_params(blog)),
            Err(rejection) => Err(site.error(ApiError::validation_error(rejection.body_text()))),
        }
    }

    pub fn to_params(&self, blog: &BlogConfig) -> ListParams {
        ListParams::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(blog.page_size),
        )
    }
}
