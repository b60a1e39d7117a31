//! Post model
//!
//! This module provides:
//! - `Post` entity representing a blog article
//! - `PostStatus`, the two-state draft/published lifecycle
//! - Input types for creating and updating posts
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a post title (and of its slug)
pub const TITLE_MAX_LEN: usize = 255;
/// Maximum length of the meta description
pub const META_DESCRIPTION_MAX_LEN: usize = 255;
/// Maximum length of the meta keywords
pub const META_KEYWORDS_MAX_LEN: usize = 160;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    pub title: String,
    /// Storage path of the featured image, see [`featured_image_path`]
    pub featured_image: Option<String>,
    /// Article body
    pub body: String,
    /// Author user ID
    pub author_id: i64,
    /// Publication status
    pub status: PostStatus,
    /// Whether readers may comment on this post
    pub allow_comments: bool,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    /// First time the post was saved as published; never re-derived once set
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new draft post. The ID is assigned by the database.
    pub fn new(slug: String, title: String, body: String, author_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            slug,
            title,
            featured_image: None,
            body,
            author_id,
            status: PostStatus::Draft,
            allow_comments: true,
            meta_description: None,
            meta_keywords: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.status.is_draft()
    }

    /// A post is published exactly when it is not a draft
    pub fn is_published(&self) -> bool {
        !self.is_draft()
    }

    /// Move the post to `Published`.
    ///
    /// The publication timestamp is filled in by the next [`Post::stamp_save`].
    pub fn publish(&mut self) {
        self.status = PostStatus::Published;
    }

    /// Move the post back to `Draft`. `published_at` is kept.
    pub fn revert_to_draft(&mut self) {
        self.status = PostStatus::Draft;
    }

    /// Apply the bookkeeping that happens on every save: refresh
    /// `updated_at`, and stamp `published_at` with it the first time the
    /// post is saved as published.
    pub fn stamp_save(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        if self.is_published() && self.published_at.is_none() {
            self.published_at = Some(self.updated_at);
        }
    }

    /// Public path of this post
    pub fn url(&self) -> String {
        format!("/{}/", self.slug)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Upload location for a post's featured image: `blog/<slug>/<filename>`.
pub fn featured_image_path(slug: &str, filename: &str) -> String {
    let path = format!("blog/{}/{}", slug, filename);
    tracing::debug!("Featured image for '{}' stored at {}", slug, path);
    path
}

/// Post publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Not visible to readers
    #[default]
    Draft,
    /// Visible to readers
    Published,
}

impl PostStatus {
    /// Map the persisted `is_draft` flag to a status
    pub fn from_is_draft(is_draft: bool) -> Self {
        if is_draft {
            PostStatus::Draft
        } else {
            PostStatus::Published
        }
    }

    pub fn is_draft(self) -> bool {
        self == PostStatus::Draft
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a new post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostInput {
    /// URL-friendly slug; generated from the title when empty
    #[serde(default)]
    pub slug: String,
    pub title: String,
    pub body: String,
    pub author_id: i64,
    pub featured_image: Option<String>,
    /// Publication status (defaults to Draft)
    pub status: Option<PostStatus>,
    /// Defaults to true
    pub allow_comments: Option<bool>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    /// Tag names; missing tags are created
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreatePostInput {
    pub fn new(title: impl Into<String>, body: impl Into<String>, author_id: i64) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            author_id,
            ..Default::default()
        }
    }

    /// Set an explicit slug
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the tag names
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allow_comments(mut self, allow_comments: bool) -> Self {
        self.allow_comments = Some(allow_comments);
        self
    }

    pub fn with_featured_image(mut self, path: impl Into<String>) -> Self {
        self.featured_image = Some(path.into());
        self
    }

    pub fn with_meta(mut self, description: impl Into<String>, keywords: impl Into<String>) -> Self {
        self.meta_description = Some(description.into());
        self.meta_keywords = Some(keywords.into());
        self
    }
}

/// Input for updating an existing post.
///
/// For the optional text fields, an empty string clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub featured_image: Option<String>,
    pub status: Option<PostStatus>,
    pub allow_comments: Option<bool>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    /// Replaces the full tag set when present
    pub tags: Option<Vec<String>>,
}

impl UpdatePostInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_allow_comments(mut self, allow_comments: bool) -> Self {
        self.allow_comments = Some(allow_comments);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.slug.is_some()
            || self.title.is_some()
            || self.body.is_some()
            || self.featured_image.is_some()
            || self.status.is_some()
            || self.allow_comments.is_some()
            || self.meta_description.is_some()
            || self.meta_keywords.is_some()
            || self.tags.is_some()
    }

    /// Copy the set fields onto `post`. Tags are handled separately.
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(slug) = &self.slug {
            post.slug = slug.clone();
        }
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(body) = &self.body {
            post.body = body.clone();
        }
        if let Some(image) = &self.featured_image {
            post.featured_image = non_empty(image);
        }
        match self.status {
            Some(PostStatus::Published) => post.publish(),
            Some(PostStatus::Draft) => post.revert_to_draft(),
            None => {}
        }
        if let Some(allow) = self.allow_comments {
            post.allow_comments = allow;
        }
        if let Some(description) = &self.meta_description {
            post.meta_description = non_empty(description);
        }
        if let Some(keywords) = &self.meta_keywords {
            post.meta_keywords = non_empty(keywords);
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create pagination parameters; the page is at least 1 and the page
    /// size is clamped to 1..=100.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        ((self.total as u64 + self.per_page as u64 - 1) / self.per_page as u64) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Transform the items, keeping the pagination metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft() -> Post {
        Post::new("hello".to_string(), "Hello".to_string(), "Body".to_string(), 1)
    }

    #[test]
    fn test_new_post_is_draft_with_comments_allowed() {
        let post = draft();

        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.is_draft());
        assert!(!post.is_published());
        assert!(post.allow_comments);
        assert!(post.published_at.is_none());
    }

    #[test]
    fn test_is_published_is_negation_of_draft() {
        for is_draft in [true, false] {
            let mut post = draft();
            post.status = PostStatus::from_is_draft(is_draft);
            assert_eq!(post.is_published(), !is_draft);
            assert_eq!(post.is_draft(), is_draft);
        }
    }

    #[test]
    fn test_stamp_save_on_draft_only_refreshes_updated_at() {
        let mut post = draft();
        let later = post.updated_at + Duration::seconds(10);

        post.stamp_save(later);

        assert_eq!(post.updated_at, later);
        assert!(post.published_at.is_none());
    }

    #[test]
    fn test_stamp_save_sets_published_at_once() {
        let mut post = draft();
        post.publish();

        let first = post.created_at + Duration::seconds(5);
        post.stamp_save(first);
        assert_eq!(post.published_at, Some(first));
        assert_eq!(post.published_at, Some(post.updated_at));

        let second = first + Duration::seconds(5);
        post.stamp_save(second);
        assert_eq!(post.updated_at, second);
        assert_eq!(post.published_at, Some(first));
    }

    #[test]
    fn test_revert_to_draft_keeps_published_at() {
        let mut post = draft();
        post.publish();
        let now = post.created_at + Duration::seconds(1);
        post.stamp_save(now);

        post.revert_to_draft();
        post.stamp_save(now + Duration::seconds(1));

        assert!(post.is_draft());
        assert_eq!(post.published_at, Some(now));
    }

    #[test]
    fn test_explicit_published_at_is_not_overwritten() {
        let mut post = draft();
        let scheduled = post.created_at - Duration::days(3);
        post.published_at = Some(scheduled);
        post.publish();

        post.stamp_save(Utc::now());

        assert_eq!(post.published_at, Some(scheduled));
    }

    #[test]
    fn test_url_and_display() {
        let post = draft();
        assert_eq!(post.url(), "/hello/");
        assert_eq!(post.to_string(), "Hello");
    }

    #[test]
    fn test_featured_image_path() {
        assert_eq!(featured_image_path("my-post", "cover.png"), "blog/my-post/cover.png");
    }

    #[test]
    fn test_post_status_serialization() {
        assert_eq!(serde_json::to_string(&PostStatus::Draft).unwrap(), "\"draft\"");
        assert_eq!(serde_json::to_string(&PostStatus::Published).unwrap(), "\"published\"");
        assert_eq!(PostStatus::default(), PostStatus::Draft);
    }

    #[test]
    fn test_update_input_apply_to() {
        let mut post = draft();
        post.meta_keywords = Some("old".to_string());

        let input = UpdatePostInput::new()
            .with_title("New title")
            .with_status(PostStatus::Published)
            .with_allow_comments(false);
        let input = UpdatePostInput {
            meta_keywords: Some(String::new()),
            ..input
        };

        assert!(input.has_changes());
        input.apply_to(&mut post);

        assert_eq!(post.title, "New title");
        assert!(post.is_published());
        assert!(!post.allow_comments);
        assert!(post.meta_keywords.is_none());
        assert_eq!(post.body, "Body");
    }

    #[test]
    fn test_update_input_empty_has_no_changes() {
        assert!(!UpdatePostInput::new().has_changes());
    }

    #[test]
    fn test_list_params_clamping_and_offset() {
        let params = ListParams::new(0, 500);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
        assert_eq!(params.offset(), 0);

        let params = ListParams::new(3, 10);
        assert_eq!(params.offset(), 20);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn test_paged_result_pages() {
        let params = ListParams::new(2, 10);
        let result = PagedResult::new(vec![1, 2, 3], 23, &params);

        assert_eq!(result.total_pages(), 3);
        assert!(result.has_next());
        assert!(result.has_prev());

        let mapped = result.map(|n| n * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert_eq!(mapped.total, 23);

        let empty: PagedResult<i32> = PagedResult::new(Vec::new(), 0, &ListParams::default());
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_next());
    }
}
