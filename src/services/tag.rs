//! Tag service
//!
//! Business rules for tags:
//! - Create tags explicitly or reuse one by name
//! - Tag sizes (number of associated posts, drafts included)
//! - Deleting a tag detaches it from posts without touching them

use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagWithSize, TAG_NAME_MAX_LEN};
use crate::services::slug::{generate_slug, is_valid_slug, numbered};
use anyhow::Context;
use std::sync::Arc;

/// Fallback slug base for names without any ASCII letters or digits
const FALLBACK_TAG_SLUG: &str = "tag";

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Duplicate slug
    #[error("Tag slug already exists: {0}")]
    DuplicateSlug(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service for managing blog tags
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Create a tag with an explicit slug, or one generated from the name.
    ///
    /// # Errors
    /// - `ValidationError` if the name is empty or too long, or the slug is not URL-safe
    /// - `DuplicateSlug` if an explicit slug is already taken
    pub async fn create(&self, name: &str, slug: Option<&str>) -> Result<Tag, TagServiceError> {
        let name = validate_name(name)?;

        let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => {
                validate_slug(slug)?;
                if self
                    .repo
                    .get_by_slug(slug)
                    .await
                    .context("Failed to check slug uniqueness")?
                    .is_some()
                {
                    return Err(TagServiceError::DuplicateSlug(slug.to_string()));
                }
                slug.to_string()
            }
            None => self.unique_slug_for(name).await?,
        };

        let created = self
            .repo
            .create(&Tag::new(slug, name.to_string()))
            .await
            .context("Failed to create tag")?;

        tracing::debug!("Created tag '{}' ({})", created.name, created.slug);
        Ok(created)
    }

    /// Get the tag with this name, creating it if needed
    ///
    /// # Errors
    /// - `ValidationError` if the name is empty or too long
    pub async fn create_or_get(&self, name: &str) -> Result<Tag, TagServiceError> {
        let trimmed = validate_name(name)?;

        if let Some(existing) = self
            .repo
            .get_by_name(trimmed)
            .await
            .context("Failed to check existing tag")?
        {
            return Ok(existing);
        }

        self.create(trimmed, None).await
    }

    /// Check every name without touching the store
    ///
    /// # Errors
    /// - `ValidationError` for the first empty or too long name
    pub fn validate_names(names: &[String]) -> Result<(), TagServiceError> {
        names.iter().try_for_each(|name| validate_name(name).map(|_| ()))
    }

    /// Resolve tag names to tags, creating missing ones. Duplicate names
    /// collapse to one tag; input order is kept. Nothing is created unless
    /// every name is valid.
    pub async fn resolve_names(&self, names: &[String]) -> Result<Vec<Tag>, TagServiceError> {
        Self::validate_names(names)?;

        let mut tags: Vec<Tag> = Vec::with_capacity(names.len());
        for name in names {
            let tag = self.create_or_get(name).await?;
            if !tags.iter().any(|t| t.id == tag.id) {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get tag by slug")
            .map_err(Into::into)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag by ID")
            .map_err(Into::into)
    }

    /// All tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }

    /// All tags ordered by name, each with its size
    pub async fn list_with_sizes(&self) -> Result<Vec<TagWithSize>, TagServiceError> {
        self.repo
            .list_with_sizes()
            .await
            .context("Failed to list tags with sizes")
            .map_err(Into::into)
    }

    /// Number of posts associated with a tag, drafts included
    ///
    /// # Errors
    /// - `NotFound` if the tag doesn't exist
    pub async fn size(&self, tag_id: i64) -> Result<i64, TagServiceError> {
        self.require(tag_id).await?;
        self.repo
            .size(tag_id)
            .await
            .context("Failed to count tag posts")
            .map_err(Into::into)
    }

    /// Tags of a post ordered by name
    pub async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .get_by_post_id(post_id)
            .await
            .context("Failed to get tags by post")
            .map_err(Into::into)
    }

    /// Replace a post's tags with the given names, creating missing tags
    pub async fn set_post_tags(&self, post_id: i64, names: &[String]) -> Result<Vec<Tag>, TagServiceError> {
        let tags = self.resolve_names(names).await?;
        let ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
        self.repo
            .set_for_post(post_id, &ids)
            .await
            .context("Failed to set post tags")?;
        self.get_by_post_id(post_id).await
    }

    pub async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<(), TagServiceError> {
        self.repo
            .add_to_post(tag_id, post_id)
            .await
            .context("Failed to add tag to post")
            .map_err(Into::into)
    }

    pub async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<(), TagServiceError> {
        self.repo
            .remove_from_post(tag_id, post_id)
            .await
            .context("Failed to remove tag from post")
            .map_err(Into::into)
    }

    /// Delete a tag. Its post associations are removed; the posts remain.
    ///
    /// # Errors
    /// - `NotFound` if the tag doesn't exist
    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        let tag = self.require(id).await?;

        self.repo
            .delete(tag.id)
            .await
            .context("Failed to delete tag")?;

        Ok(())
    }

    async fn require(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag with ID {} not found", id)))
    }

    async fn unique_slug_for(&self, name: &str) -> Result<String, TagServiceError> {
        let mut base = generate_slug(name);
        if base.is_empty() {
            base = FALLBACK_TAG_SLUG.to_string();
        }
        // Leave room for a numeric suffix
        base.truncate(TAG_NAME_MAX_LEN - 6);
        let base = base.trim_end_matches('-').to_string();

        let mut n = 1;
        loop {
            let candidate = numbered(&base, n);
            if self
                .repo
                .get_by_slug(&candidate)
                .await
                .context("Failed to check slug uniqueness")?
                .is_none()
            {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

fn validate_name(name: &str) -> Result<&str, TagServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TagServiceError::ValidationError(
            "Tag name cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > TAG_NAME_MAX_LEN {
        return Err(TagServiceError::ValidationError(format!(
            "Tag name cannot exceed {} characters",
            TAG_NAME_MAX_LEN
        )));
    }
    Ok(trimmed)
}

fn validate_slug(slug: &str) -> Result<(), TagServiceError> {
    if !is_valid_slug(slug) || slug.len() > TAG_NAME_MAX_LEN {
        return Err(TagServiceError::ValidationError(format!(
            "Invalid tag slug: {}",
            slug
        )));
    }
    Ok(())
}
