//! Site-wide page context
//!
//! The `tag_context` middleware loads the full tag list once per request and
//! stores it in the request extensions as a `SiteContext`. Handlers wrap
//! their payloads in a `PageContext` so every page, error pages included,
//! carries the tag list.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::TagWithSize;

/// Values available to every page
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteContext {
    /// All tags ordered by name, with their sizes
    pub tags: Vec<TagWithSize>,
}

impl SiteContext {
    /// Wrap a payload into a page
    pub fn page<T: Serialize>(&self, data: T) -> Json<PageContext<T>> {
        Json(PageContext {
            tags: self.tags.clone(),
            data,
        })
    }

    /// Wrap an error into a page, keeping its status code
    pub fn error(&self, err: impl Into<ApiError>) -> PageError {
        PageError {
            tags: self.tags.clone(),
            error: err.into(),
        }
    }

    /// Find a tag of the context by slug
    pub fn find_tag(&self, slug: &str) -> Option<&TagWithSize> {
        self.tags.iter().find(|t| t.tag.slug == slug)
    }
}

/// A page payload with the site context merged in
#[derive(Debug, Serialize)]
pub struct PageContext<T> {
    pub tags: Vec<TagWithSize>,
    #[serde(flatten)]
    pub data: T,
}

/// An error response that still carries the site context
#[derive(Debug)]
pub struct PageError {
    pub tags: Vec<TagWithSize>,
    pub error: ApiError,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status: StatusCode = self.error.status();
        let body = PageContext {
            tags: self.tags,
            data: self.error,
        };
        (status, Json(body)).into_response()
    }
}

/// Inject the tag list into every request
pub async fn tag_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let tags = state.tag_service.list_with_sizes().await?;

    request.extensions_mut().insert(SiteContext { tags });
    Ok(next.run(request).await)
}
