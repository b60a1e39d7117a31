//! API layer - HTTP handlers and routing
//!
//! Read-only blog routes:
//! - `/` index of published posts
//! - `/tags/{tag}/` posts carrying a tag
//! - `/{slug}/` a single published post
//! - `/health` database ping
//!
//! Every request passes through the `tag_context` middleware, so each page
//! (error pages included) carries the full tag list.

pub mod common;
pub mod context;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod site;
pub mod tags;

use axum::{
    http::{header, HeaderValue, Method, Uri},
    middleware as axum_middleware,
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use context::{PageContext, PageError, SiteContext};
pub use middleware::{ApiError, AppState};

/// Build the blog routes without state or layers
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .merge(site::router())
        .merge(tags::router())
        .merge(posts::router())
        .fallback(not_found)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    build_api_router()
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            context::tag_context,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    if origin == "*" {
        return cors.allow_origin(Any);
    }

    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin: {}", origin);
            cors
        }
    }
}

async fn not_found(Extension(site): Extension<SiteContext>, uri: Uri) -> PageError {
    site.error(ApiError::not_found(format!("No page at {}", uri.path())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlogConfig;
    use crate::db::repositories::{
        SqlxCommentRepository, SqlxPostRepository, SqlxTagRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateCommentInput, CreatePostInput, PostStatus, User};
    use crate::services::{CommentService, PostService, TagService};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state() -> (AppState, i64) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = SqlxUserRepository::new(pool.clone())
            .create(&User::new("author".to_string(), String::new()))
            .await
            .expect("Failed to create test user")
            .id;

        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let tag_service = Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone())));
        let post_service = Arc::new(PostService::new(post_repo.clone(), tag_service.clone()));
        let comment_service = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            post_repo,
        ));

        let state = AppState {
            pool,
            post_service,
            tag_service,
            comment_service,
            blog: Arc::new(BlogConfig::default()),
        };
        (state, author)
    }

    async fn get(state: &AppState, uri: &str) -> (StatusCode, Value) {
        let app = build_router(state.clone(), "*");
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn published(title: &str, author: i64) -> CreatePostInput {
        CreatePostInput::new(title, "Body", author).with_status(PostStatus::Published)
    }

    #[tokio::test]
    async fn test_index_lists_published_posts_with_tags() {
        let (state, author) = test_state().await;
        state
            .post_service
            .create(published("First", author).with_tags(["Rust"]))
            .await
            .unwrap();
        state
            .post_service
            .create(CreatePostInput::new("Hidden", "Body", author).with_tags(["Draft Tag"]))
            .await
            .unwrap();

        let (status, body) = get(&state, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["posts"][0]["slug"], "first");
        assert_eq!(body["latest"][0]["slug"], "first");
        // Tag context includes every tag, sized with drafts
        let tags = body["tags"].as_array().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0]["name"], "Draft Tag");
        assert_eq!(tags[0]["size"], 1);
    }

    #[tokio::test]
    async fn test_index_pagination_query() {
        let (state, author) = test_state().await;
        for i in 0..3 {
            state
                .post_service
                .create(published(&format!("Post {}", i), author))
                .await
                .unwrap();
        }

        let (status, body) = get(&state, "/?page=2&page_size=2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 2);
        assert_eq!(body["page_size"], 2);
        assert_eq!(body["total_pages"], 2);
        assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_query_is_a_page_error() {
        let (state, author) = test_state().await;
        state
            .post_service
            .create(published("First", author).with_tags(["Rust"]))
            .await
            .unwrap();

        for uri in ["/?page=abc", "/tags/rust/?page_size=-1"] {
            let (status, body) = get(&state, uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
            assert_eq!(body["tags"][0]["slug"], "rust");
        }
    }

    #[tokio::test]
    async fn test_post_page_with_navigation_and_comments() {
        let (state, author) = test_state().await;
        let first = state
            .post_service
            .create(published("First", author).with_tags(["Rust"]))
            .await
            .unwrap();
        let second = state
            .post_service
            .create(published("Second", author).with_tags(["Rust"]))
            .await
            .unwrap();
        state
            .comment_service
            .create(CreateCommentInput::new(second.id, author, "Nice"))
            .await
            .unwrap();

        let (status, body) = get(&state, "/second/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["post"]["title"], "Second");
        assert_eq!(body["post"]["tags"][0]["slug"], "rust");
        assert_eq!(body["previous"]["id"], first.id);
        assert!(body["next"].is_null());
        assert_eq!(body["similar"][0]["id"], first.id);
        assert_eq!(body["comments"][0]["body"], "Nice");
        assert_eq!(body["tags"][0]["size"], 2);

        // Also matched without the trailing slash
        let (status, _) = get(&state, "/second").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_page_omits_closed_comments() {
        let (state, author) = test_state().await;
        state
            .post_service
            .create(published("Quiet", author).with_allow_comments(false))
            .await
            .unwrap();

        let (status, body) = get(&state, "/quiet/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.get("comments").is_none());
    }

    #[tokio::test]
    async fn test_draft_and_missing_posts_are_not_found() {
        let (state, author) = test_state().await;
        state
            .post_service
            .create(CreatePostInput::new("Secret", "Body", author).with_tags(["Rust"]))
            .await
            .unwrap();

        for uri in ["/secret/", "/missing/"] {
            let (status, body) = get(&state, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"]["code"], "NOT_FOUND");
            assert_eq!(body["tags"][0]["slug"], "rust");
        }
    }

    #[tokio::test]
    async fn test_tag_page() {
        let (state, author) = test_state().await;
        state
            .post_service
            .create(published("Tagged", author).with_tags(["Rust"]))
            .await
            .unwrap();
        state.post_service.create(published("Plain", author)).await.unwrap();

        let (status, body) = get(&state, "/tags/rust/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tag"]["name"], "Rust");
        assert_eq!(body["total"], 1);
        assert_eq!(body["posts"][0]["slug"], "tagged");

        let (status, body) = get(&state, "/tags/unknown").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["tag"].is_null());
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found_with_context() {
        let (state, _author) = test_state().await;

        let (status, body) = get(&state, "/a/b/c").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["tags"].is_array());
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _author) = test_state().await;

        let (status, body) = get(&state, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "sqlite");
    }
}
