//! Post service
//!
//! Implements the blog's article rules:
//! - Validation and slug uniqueness on every save
//! - Publication stamping (`published_at` is set on the first published save)
//! - Previous/next navigation over published posts
//! - Similar and latest articles
//! - Paginated listings, optionally filtered by tag

use crate::db::now;
use crate::db::repositories::PostRepository;
use crate::models::{
    CreatePostInput, ListParams, PagedResult, Post, PostStatus, Tag, UpdatePostInput,
    META_DESCRIPTION_MAX_LEN, META_KEYWORDS_MAX_LEN, TITLE_MAX_LEN,
};
use crate::services::slug::{generate_slug, is_valid_slug, numbered};
use crate::services::tag::{TagService, TagServiceError};
use anyhow::Context;
use std::sync::Arc;

/// Default number of similar articles shown on a post page
pub const DEFAULT_SIMILAR_ARTICLES_LIMIT: usize = 5;

/// Fallback slug base for titles without any ASCII letters or digits
const FALLBACK_POST_SLUG: &str = "post";

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Duplicate slug
    #[error("Post slug already exists: {0}")]
    DuplicateSlug(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<TagServiceError> for PostServiceError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::ValidationError(msg) => PostServiceError::ValidationError(msg),
            TagServiceError::NotFound(msg) => PostServiceError::NotFound(msg),
            TagServiceError::DuplicateSlug(slug) => {
                PostServiceError::InternalError(anyhow::anyhow!("Tag slug conflict: {}", slug))
            }
            TagServiceError::InternalError(e) => PostServiceError::InternalError(e),
        }
    }
}

/// Post service for managing blog articles
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    tags: Arc<TagService>,
    similar_limit: usize,
}

impl PostService {
    /// Create a new post service
    pub fn new(repo: Arc<dyn PostRepository>, tags: Arc<TagService>) -> Self {
        Self {
            repo,
            tags,
            similar_limit: DEFAULT_SIMILAR_ARTICLES_LIMIT,
        }
    }

    /// Override the default number of similar articles
    pub fn with_similar_limit(mut self, limit: usize) -> Self {
        self.similar_limit = limit;
        self
    }

    /// Persist a post.
    ///
    /// Every save refreshes `updated_at`; the first save of a published post
    /// also sets `published_at` to that same instant. A post with ID 0 is
    /// inserted, anything else is updated in place.
    ///
    /// # Errors
    /// - `ValidationError` if title, body, slug or meta fields are invalid
    /// - `DuplicateSlug` if another post already uses the slug
    /// - `NotFound` if updating a post that doesn't exist
    pub async fn save(&self, mut post: Post) -> Result<Post, PostServiceError> {
        validate_post(&post)?;

        let exclude = (post.id != 0).then_some(post.id);
        if self
            .repo
            .exists_by_slug(&post.slug, exclude)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(PostServiceError::DuplicateSlug(post.slug));
        }

        post.stamp_save(now());

        if post.id == 0 {
            let created = self.repo.insert(&post).await.context("Failed to create post")?;
            tracing::debug!("Created post {} ({})", created.id, created.slug);
            return Ok(created);
        }

        if self
            .repo
            .get_by_id(post.id)
            .await
            .context("Failed to get post")?
            .is_none()
        {
            return Err(PostServiceError::NotFound(format!(
                "Post with ID {} not found",
                post.id
            )));
        }

        self.repo
            .update(&post)
            .await
            .context("Failed to update post")
            .map_err(Into::into)
    }

    /// Create a new post.
    ///
    /// An empty slug is generated from the title and made unique with a
    /// numeric suffix. Tag names in the input are created as needed.
    ///
    /// # Errors
    /// - `ValidationError` if the input is invalid
    /// - `DuplicateSlug` if an explicit slug is already taken
    pub async fn create(&self, input: CreatePostInput) -> Result<Post, PostServiceError> {
        validate_title_and_body(&input.title, &input.body)?;
        TagService::validate_names(&input.tags)?;

        let slug = if input.slug.trim().is_empty() {
            self.unique_slug_for(&input.title).await?
        } else {
            input.slug.trim().to_string()
        };

        let created_at = now();
        let mut post = Post::new(slug, input.title, input.body, input.author_id);
        post.created_at = created_at;
        post.updated_at = created_at;
        post.featured_image = input.featured_image.filter(|s| !s.is_empty());
        post.allow_comments = input.allow_comments.unwrap_or(true);
        post.meta_description = input.meta_description.filter(|s| !s.is_empty());
        post.meta_keywords = input.meta_keywords.filter(|s| !s.is_empty());
        if input.status == Some(PostStatus::Published) {
            post.publish();
        }

        let created = self.save(post).await?;

        if !input.tags.is_empty() {
            self.tags.set_post_tags(created.id, &input.tags).await?;
        }

        Ok(created)
    }

    /// Update an existing post
    ///
    /// # Errors
    /// - `NotFound` if the post doesn't exist
    /// - `ValidationError` if the resulting post is invalid
    /// - `DuplicateSlug` if the new slug is taken by another post
    pub async fn update(&self, id: i64, input: UpdatePostInput) -> Result<Post, PostServiceError> {
        let mut post = self.require(id).await?;

        if !input.has_changes() {
            return Ok(post);
        }

        if let Some(names) = &input.tags {
            TagService::validate_names(names)?;
        }

        input.apply_to(&mut post);
        let updated = self.save(post).await?;

        if let Some(names) = &input.tags {
            self.tags.set_post_tags(updated.id, names).await?;
        }

        Ok(updated)
    }

    /// Publish a post and save it
    pub async fn publish(&self, id: i64) -> Result<Post, PostServiceError> {
        let mut post = self.require(id).await?;
        post.publish();
        let saved = self.save(post).await?;
        tracing::info!("Published post {} ({})", saved.id, saved.slug);
        Ok(saved)
    }

    /// Move a post back to draft. Its original `published_at` is kept.
    pub async fn unpublish(&self, id: i64) -> Result<Post, PostServiceError> {
        let mut post = self.require(id).await?;
        post.revert_to_draft();
        self.save(post).await
    }

    /// Delete a post together with its comments and tag associations
    ///
    /// # Errors
    /// - `NotFound` if the post doesn't exist
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete post")? {
            return Err(PostServiceError::NotFound(format!(
                "Post with ID {} not found",
                id
            )));
        }
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post by ID")
            .map_err(Into::into)
    }

    /// Get a post by slug, drafts included
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, PostServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")
            .map_err(Into::into)
    }

    /// Get a post by slug only if it is published
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Option<Post>, PostServiceError> {
        Ok(self.get_by_slug(slug).await?.filter(Post::is_published))
    }

    /// Tags of a post ordered by name
    pub async fn tags_of(&self, post: &Post) -> Result<Vec<Tag>, PostServiceError> {
        Ok(self.tags.get_by_post_id(post.id).await?)
    }

    /// The closest published post created before this one
    pub async fn previous(&self, post: &Post) -> Result<Option<Post>, PostServiceError> {
        self.repo
            .previous_published(post)
            .await
            .context("Failed to get previous post")
            .map_err(Into::into)
    }

    /// The closest published post created after this one
    pub async fn next(&self, post: &Post) -> Result<Option<Post>, PostServiceError> {
        self.repo
            .next_published(post)
            .await
            .context("Failed to get next post")
            .map_err(Into::into)
    }

    /// Published posts sharing at least one tag with `post`, newest first.
    /// Uses the configured limit when `limit` is `None`.
    pub async fn similar_articles(
        &self,
        post: &Post,
        limit: Option<usize>,
    ) -> Result<Vec<Post>, PostServiceError> {
        let limit = limit.unwrap_or(self.similar_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.repo
            .similar_published(post.id, limit)
            .await
            .context("Failed to get similar posts")
            .map_err(Into::into)
    }

    /// The `count` most recently created published posts
    pub async fn latest_articles(&self, count: usize) -> Result<Vec<Post>, PostServiceError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        self.repo
            .latest_published(count)
            .await
            .context("Failed to get latest posts")
            .map_err(Into::into)
    }

    /// Published posts, most recently published first
    pub async fn list_published(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let items = self
            .repo
            .list_published(params)
            .await
            .context("Failed to list posts")?;
        let total = self
            .repo
            .count_published()
            .await
            .context("Failed to count posts")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// Published posts carrying the tag with this slug. An unknown tag
    /// yields an empty page.
    pub async fn list_by_tag(
        &self,
        tag_slug: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let Some(tag) = self.tags.get_by_slug(tag_slug).await? else {
            return Ok(PagedResult::new(Vec::new(), 0, params));
        };

        let items = self
            .repo
            .list_published_by_tag(tag.id, params)
            .await
            .context("Failed to list posts by tag")?;
        let total = self
            .repo
            .count_published_by_tag(tag.id)
            .await
            .context("Failed to count posts by tag")?;

        Ok(PagedResult::new(items, total, params))
    }

    async fn require(&self, id: i64) -> Result<Post, PostServiceError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| PostServiceError::NotFound(format!("Post with ID {} not found", id)))
    }

    async fn unique_slug_for(&self, title: &str) -> Result<String, PostServiceError> {
        let mut base = generate_slug(title);
        if base.is_empty() {
            base = FALLBACK_POST_SLUG.to_string();
        }
        base.truncate(TITLE_MAX_LEN - 10);
        let base = base.trim_end_matches('-').to_string();

        let mut n = 1;
        loop {
            let candidate = numbered(&base, n);
            if !self
                .repo
                .exists_by_slug(&candidate, None)
                .await
                .context("Failed to check slug uniqueness")?
            {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

fn validate_title_and_body(title: &str, body: &str) -> Result<(), PostServiceError> {
    if title.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "Title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(PostServiceError::ValidationError(format!(
            "Title cannot exceed {} characters",
            TITLE_MAX_LEN
        )));
    }
    if body.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "Body cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_post(post: &Post) -> Result<(), PostServiceError> {
    validate_title_and_body(&post.title, &post.body)?;

    if !is_valid_slug(&post.slug) || post.slug.len() > TITLE_MAX_LEN {
        return Err(PostServiceError::ValidationError(format!(
            "Invalid slug: '{}'",
            post.slug
        )));
    }

    let too_long = |value: &Option<String>, max: usize| {
        value.as_ref().is_some_and(|v| v.chars().count() > max)
    };
    if too_long(&post.meta_description, META_DESCRIPTION_MAX_LEN) {
        return Err(PostServiceError::ValidationError(format!(
            "Meta description cannot exceed {} characters",
            META_DESCRIPTION_MAX_LEN
        )));
    }
    if too_long(&post.meta_keywords, META_KEYWORDS_MAX_LEN) {
        return Err(PostServiceError::ValidationError(format!(
            "Meta keywords cannot exceed {} characters",
            META_KEYWORDS_MAX_LEN
        )));
    }

    Ok(())
}
