//! Tag repository
//!
//! Database operations for tags and their post associations.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::{now, DynDatabasePool};
use crate::models::{Tag, TagWithSize};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Get tag by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// List all tags ordered by name, each with its post count
    async fn list_with_sizes(&self) -> Result<Vec<TagWithSize>>;

    /// Number of posts (drafts included) associated with a tag
    async fn size(&self, tag_id: i64) -> Result<i64>;

    /// Delete a tag and its post associations. Posts are untouched.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Associate tag with post
    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()>;

    /// Remove tag from post
    async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<()>;

    /// Replace the full tag set of a post
    async fn set_for_post(&self, post_id: i64, tag_ids: &[i64]) -> Result<()>;

    /// Get tags for a post ordered by name
    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.sqlite()?, tag).await,
            DatabaseDriver::Mysql => create_tag_mysql(self.pool.mysql()?, tag).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let sql = "SELECT id, slug, name, created_at FROM tags WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get tag by ID")?;
                row.map(|r| row_to_tag_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get tag by ID")?;
                row.map(|r| row_to_tag_mysql(&r)).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let sql = "SELECT id, slug, name, created_at FROM tags WHERE slug = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(slug)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get tag by slug")?;
                row.map(|r| row_to_tag_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(slug)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get tag by slug")?;
                row.map(|r| row_to_tag_mysql(&r)).transpose()
            }
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let sql = "SELECT id, slug, name, created_at FROM tags WHERE name = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(name)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get tag by name")?;
                row.map(|r| row_to_tag_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(name)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get tag by name")?;
                row.map(|r| row_to_tag_mysql(&r)).transpose()
            }
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let sql = "SELECT id, slug, name, created_at FROM tags ORDER BY name, id";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list tags")?;
                rows.iter().map(row_to_tag_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list tags")?;
                rows.iter().map(row_to_tag_mysql).collect()
            }
        }
    }

    async fn list_with_sizes(&self) -> Result<Vec<TagWithSize>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_with_sizes_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_tags_with_sizes_mysql(self.pool.mysql()?).await,
        }
    }

    async fn size(&self, tag_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS size FROM post_tags WHERE tag_id = ?";
        let size: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(tag_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count tag posts")?
                .get("size"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(tag_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count tag posts")?
                .get("size"),
        };
        Ok(size)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_tag_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_tag_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(post_id)
                    .bind(tag_id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to add tag to post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("INSERT IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(post_id)
                    .bind(tag_id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to add tag to post")?;
            }
        }
        Ok(())
    }

    async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<()> {
        let sql = "DELETE FROM post_tags WHERE post_id = ? AND tag_id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(post_id)
                    .bind(tag_id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to remove tag from post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(post_id)
                    .bind(tag_id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to remove tag from post")?;
            }
        }
        Ok(())
    }

    async fn set_for_post(&self, post_id: i64, tag_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => set_post_tags_sqlite(self.pool.sqlite()?, post_id, tag_ids).await,
            DatabaseDriver::Mysql => set_post_tags_mysql(self.pool.mysql()?, post_id, tag_ids).await,
        }
    }

    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Tag>> {
        let sql = r#"
            SELECT t.id, t.slug, t.name, t.created_at
            FROM tags t
            INNER JOIN post_tags pt ON t.id = pt.tag_id
            WHERE pt.post_id = ?
            ORDER BY t.name, t.id
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(post_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to get tags for post")?;
                rows.iter().map(row_to_tag_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(post_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to get tags for post")?;
                rows.iter().map(row_to_tag_mysql).collect()
            }
        }
    }
}

const TAGS_WITH_SIZES_SQL: &str = r#"
    SELECT t.id, t.slug, t.name, t.created_at, COUNT(pt.post_id) AS size
    FROM tags t
    LEFT JOIN post_tags pt ON t.id = pt.tag_id
    GROUP BY t.id, t.slug, t.name, t.created_at
    ORDER BY t.name, t.id
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let now = now();

    let result = sqlx::query("INSERT INTO tags (slug, name, created_at) VALUES (?, ?, ?)")
        .bind(&tag.slug)
        .bind(&tag.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        slug: tag.slug.clone(),
        name: tag.name.clone(),
        created_at: now,
    })
}

async fn list_tags_with_sizes_sqlite(pool: &SqlitePool) -> Result<Vec<TagWithSize>> {
    let rows = sqlx::query(TAGS_WITH_SIZES_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to list tags with sizes")?;

    rows.iter()
        .map(|row| Ok(TagWithSize::new(row_to_tag_sqlite(row)?, row.get("size"))))
        .collect()
}

async fn delete_tag_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let unlinked = sqlx::query("DELETE FROM post_tags WHERE tag_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to unlink tag from posts")?
        .rows_affected();

    let deleted = sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete tag")?
        .rows_affected();

    tx.commit().await.context("Failed to commit tag deletion")?;

    if deleted > 0 {
        tracing::info!("Deleted tag {} and {} post association(s)", id, unlinked);
    }
    Ok(deleted > 0)
}

async fn set_post_tags_sqlite(pool: &SqlitePool, post_id: i64, tag_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear post tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add tag to post")?;
    }

    tx.commit().await.context("Failed to commit post tags")?;
    Ok(())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    let now = now();

    let result = sqlx::query("INSERT INTO tags (slug, name, created_at) VALUES (?, ?, ?)")
        .bind(&tag.slug)
        .bind(&tag.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        slug: tag.slug.clone(),
        name: tag.name.clone(),
        created_at: now,
    })
}

async fn list_tags_with_sizes_mysql(pool: &MySqlPool) -> Result<Vec<TagWithSize>> {
    let rows = sqlx::query(TAGS_WITH_SIZES_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to list tags with sizes")?;

    rows.iter()
        .map(|row| Ok(TagWithSize::new(row_to_tag_mysql(row)?, row.get("size"))))
        .collect()
}

async fn delete_tag_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let unlinked = sqlx::query("DELETE FROM post_tags WHERE tag_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to unlink tag from posts")?
        .rows_affected();

    let deleted = sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete tag")?
        .rows_affected();

    tx.commit().await.context("Failed to commit tag deletion")?;

    if deleted > 0 {
        tracing::info!("Deleted tag {} and {} post association(s)", id, unlinked);
    }
    Ok(deleted > 0)
}

async fn set_post_tags_mysql(pool: &MySqlPool, post_id: i64, tag_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear post tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add tag to post")?;
    }

    tx.commit().await.context("Failed to commit post tags")?;
    Ok(())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}
