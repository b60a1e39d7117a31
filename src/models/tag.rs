//! Tag model
//!
//! Tags group posts across the blog. A tag's `size` is the number of posts
//! currently associated with it and is computed on read, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a tag name
pub const TAG_NAME_MAX_LEN: usize = 100;

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new Tag with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(slug: String, name: String) -> Self {
        Self {
            id: 0,
            slug,
            name,
            created_at: Utc::now(),
        }
    }

    /// Path of the listing page for this tag
    pub fn url(&self) -> String {
        format!("/tags/{}/", self.slug)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Tag together with the number of posts carrying it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagWithSize {
    #[serde(flatten)]
    pub tag: Tag,
    /// Number of associated posts, drafts included
    pub size: i64,
}

impl TagWithSize {
    pub fn new(tag: Tag, size: i64) -> Self {
        Self { tag, size }
    }
}
