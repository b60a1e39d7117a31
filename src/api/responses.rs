//! Shared API response types
//!
//! Post and tag shapes reused by the index, tag and post pages.

use serde::Serialize;

use crate::models::{PagedResult, Post, Tag};

// ============================================================================
// Post Response Types
// ============================================================================

/// Full post response
/// Used on the post page
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub slug: String,
    pub url: String,
    pub title: String,
    pub body: String,
    pub author_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    pub allow_comments: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_keywords: Option<String>,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<TagInfo>,
}

impl PostResponse {
    pub fn new(post: Post, tags: Vec<Tag>) -> Self {
        Self {
            id: post.id,
            url: post.url(),
            slug: post.slug,
            title: post.title,
            body: post.body,
            author_id: post.author_id,
            featured_image: post.featured_image,
            allow_comments: post.allow_comments,
            meta_description: post.meta_description,
            meta_keywords: post.meta_keywords,
            published_at: post.published_at.map(|dt| dt.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            tags: tags.into_iter().map(TagInfo::from).collect(),
        }
    }
}

/// Simplified post response for list views and navigation links
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub slug: String,
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    pub published_at: Option<String>,
    pub created_at: String,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            url: post.url(),
            slug: post.slug,
            title: post.title,
            featured_image: post.featured_image,
            meta_description: post.meta_description,
            published_at: post.published_at.map(|dt| dt.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
        }
    }
}

/// Tag info embedded in post responses
#[derive(Debug, Serialize, Clone)]
pub struct TagInfo {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub url: String,
}

impl From<Tag> for TagInfo {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            url: tag.url(),
            slug: tag.slug,
            name: tag.name,
        }
    }
}

// ============================================================================
// Pagination Response Types
// ============================================================================

/// Paginated post list response
#[derive(Debug, Serialize)]
pub struct PaginatedPostsResponse {
    pub posts: Vec<PostSummary>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl From<PagedResult<Post>> for PaginatedPostsResponse {
    fn from(result: PagedResult<Post>) -> Self {
        let total_pages = result.total_pages();
        let result = result.map(PostSummary::from);
        Self {
            posts: result.items,
            total: result.total,
            page: result.page,
            page_size: result.per_page,
            total_pages,
        }
    }
}
