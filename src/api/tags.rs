//! Tag pages
//!
//! - GET /tags/{tag}/ - Published posts carrying a tag

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;

use crate::api::common::PaginationQuery;
use crate::api::context::{PageContext, PageError, SiteContext};
use crate::api::middleware::AppState;
use crate::api::responses::{PaginatedPostsResponse, TagInfo};

/// Tag page payload
#[derive(Debug, Serialize)]
pub struct TagPage {
    /// The requested tag, absent when no tag has this slug
    pub tag: Option<TagInfo>,
    #[serde(flatten)]
    pub posts: PaginatedPostsResponse,
}

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags/{tag}", get(tag_posts_handler))
        .route("/tags/{tag}/", get(tag_posts_handler))
}

/// GET /tags/{tag}/ - Posts with a tag. An unknown tag gives an empty list.
async fn tag_posts_handler(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    Path(tag): Path<String>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<PageContext<TagPage>>, PageError> {
    let params = PaginationQuery::params_or_error(query, &site, &state.blog)?;

    let posts = state
        .post_service
        .list_by_tag(&tag, &params)
        .await
        .map_err(|e| site.error(e))?;

    let info = site.find_tag(&tag).map(|t| TagInfo::from(t.tag.clone()));

    Ok(site.page(TagPage {
        tag: info,
        posts: posts.into(),
    }))
}
