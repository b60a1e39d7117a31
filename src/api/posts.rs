//! Post pages
//!
//! - GET / - Published posts, most recently published first, plus the
//!   latest articles block
//! - GET /{slug}/ - A single published post with its navigation, similar
//!   articles and comment thread

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;

use crate::api::common::PaginationQuery;
use crate::api::context::{PageContext, PageError, SiteContext};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{PaginatedPostsResponse, PostResponse, PostSummary};
use crate::models::CommentNode;

/// Index page payload
#[derive(Debug, Serialize)]
pub struct IndexPage {
    #[serde(flatten)]
    pub posts: PaginatedPostsResponse,
    pub latest: Vec<PostSummary>,
}

/// Post page payload
#[derive(Debug, Serialize)]
pub struct PostPage {
    pub post: PostResponse,
    pub previous: Option<PostSummary>,
    pub next: Option<PostSummary>,
    pub similar: Vec<PostSummary>,
    /// Present only when the post accepts comments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentNode>>,
}

/// Build the post routes. Each path also matches without its trailing slash.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index_handler))
        .route("/{slug}", get(post_detail_handler))
        .route("/{slug}/", get(post_detail_handler))
}

/// GET / - Paginated published posts
async fn index_handler(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<PageContext<IndexPage>>, PageError> {
    let params = PaginationQuery::params_or_error(query, &site, &state.blog)?;

    let posts = state
        .post_service
        .list_published(&params)
        .await
        .map_err(|e| site.error(e))?;

    let latest = state
        .post_service
        .latest_articles(state.blog.latest_articles_count)
        .await
        .map_err(|e| site.error(e))?;

    Ok(site.page(IndexPage {
        posts: posts.into(),
        latest: latest.into_iter().map(PostSummary::from).collect(),
    }))
}

/// GET /{slug}/ - A published post. Drafts are reported as not found.
async fn post_detail_handler(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    Path(slug): Path<String>,
) -> Result<Json<PageContext<PostPage>>, PageError> {
    let service = &state.post_service;

    let post = service
        .get_published_by_slug(&slug)
        .await
        .map_err(|e| site.error(e))?
        .ok_or_else(|| site.error(ApiError::not_found(format!("Post not found: {}", slug))))?;

    let tags = service.tags_of(&post).await.map_err(|e| site.error(e))?;
    let previous = service.previous(&post).await.map_err(|e| site.error(e))?;
    let next = service.next(&post).await.map_err(|e| site.error(e))?;
    let similar = service
        .similar_articles(&post, None)
        .await
        .map_err(|e| site.error(e))?;

    let comments = if post.allow_comments {
        Some(
            state
                .comment_service
                .thread(post.id)
                .await
                .map_err(|e| site.error(e))?,
        )
    } else {
        None
    };

    Ok(site.page(PostPage {
        post: PostResponse::new(post, tags),
        previous: previous.map(PostSummary::from),
        next: next.map(PostSummary::from),
        similar: similar.into_iter().map(PostSummary::from).collect(),
        comments,
    }))
}
