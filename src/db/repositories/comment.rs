//! Comment repository
//!
//! Flat storage of threaded comments. Thread assembly and visibility rules
//! live in the comment service; this layer only persists rows and removes
//! reply subtrees.

use crate::config::DatabaseDriver;
use crate::db::{now, DynDatabasePool};
use crate::models::{Comment, CreateCommentInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a comment
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Every comment on a post, disabled ones included, newest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>>;

    /// Point a comment at a new parent (or make it top-level)
    async fn set_parent(&self, id: i64, parent_id: Option<i64>) -> Result<bool>;

    /// Enable or disable a comment
    async fn set_disabled(&self, id: i64, disabled: bool) -> Result<bool>;

    /// Delete a comment and every reply below it; returns rows removed
    async fn delete_subtree(&self, id: i64) -> Result<u64>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const COMMENT_COLUMNS: &str =
    "id, post_id, author_id, parent_id, body, disabled, created_at, updated_at";

/// Every comment in the subtree rooted at `?`, deepest replies first
const SUBTREE_IDS_SQL: &str = r#"
    WITH RECURSIVE subtree (id, depth) AS (
        SELECT id, 0 FROM comments WHERE id = ?
        UNION ALL
        SELECT c.id, s.depth + 1 FROM comments c INNER JOIN subtree s ON c.parent_id = s.id
    )
    SELECT id, depth FROM subtree ORDER BY depth DESC, id
"#;

/// Upper bound on bound parameters per DELETE statement
const DELETE_BATCH_SIZE: usize = 500;

fn delete_ids_sql(count: usize) -> String {
    let placeholders = vec!["?"; count].join(", ");
    format!("DELETE FROM comments WHERE id IN ({})", placeholders)
}

/// Split `(id, depth)` rows, deepest first, into DELETE batches. A batch
/// never mixes depths, so no row in it is an ancestor of another and the
/// `parent_id` cascade never fires.
fn delete_batches(rows: &[(i64, i64)]) -> Vec<Vec<i64>> {
    let mut batches: Vec<Vec<i64>> = Vec::new();
    let mut depth = None;
    for &(id, row_depth) in rows {
        let full = batches.last().map_or(true, |b| b.len() >= DELETE_BATCH_SIZE);
        if full || depth != Some(row_depth) {
            batches.push(Vec::new());
            depth = Some(row_depth);
        }
        if let Some(batch) = batches.last_mut() {
            batch.push(id);
        }
    }
    batches
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        let now = now();
        let sql = r#"
            INSERT INTO comments (post_id, author_id, parent_id, body, disabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(input.post_id)
                .bind(input.author_id)
                .bind(input.parent_id)
                .bind(&input.body)
                .bind(false)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(input.post_id)
                .bind(input.author_id)
                .bind(input.parent_id)
                .bind(&input.body)
                .bind(false)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        Ok(Comment {
            id,
            post_id: input.post_id,
            author_id: input.author_id,
            parent_id: input.parent_id,
            body: input.body.clone(),
            disabled: false,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get comment")?;
                row.map(|r| row_to_comment_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get comment")?;
                row.map(|r| row_to_comment_mysql(&r)).transpose()
            }
        }
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE post_id = ? ORDER BY created_at DESC, id DESC",
            COMMENT_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(post_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list comments")?;
                rows.iter().map(row_to_comment_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(post_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list comments")?;
                rows.iter().map(row_to_comment_mysql).collect()
            }
        }
    }

    async fn set_parent(&self, id: i64, parent_id: Option<i64>) -> Result<bool> {
        let sql = "UPDATE comments SET parent_id = ?, updated_at = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(parent_id)
                .bind(now())
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to move comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(parent_id)
                .bind(now())
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to move comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn set_disabled(&self, id: i64, disabled: bool) -> Result<bool> {
        let sql = "UPDATE comments SET disabled = ?, updated_at = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(disabled)
                .bind(now())
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(disabled)
                .bind(now())
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete_subtree(&self, id: i64) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_subtree_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_subtree_mysql(self.pool.mysql()?, id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn delete_subtree_sqlite(pool: &SqlitePool, id: i64) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows: Vec<(i64, i64)> = sqlx::query(SUBTREE_IDS_SQL)
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to collect comment replies")?
        .iter()
        .map(|row| (row.get("id"), row.get("depth")))
        .collect();

    if rows.is_empty() {
        return Ok(0);
    }

    let mut deleted: u64 = 0;
    for batch in delete_batches(&rows) {
        let sql = delete_ids_sql(batch.len());
        let mut query = sqlx::query(&sql);
        for id in &batch {
            query = query.bind(*id);
        }
        deleted += query
            .execute(&mut *tx)
            .await
            .context("Failed to delete comments")?
            .rows_affected();
    }

    tx.commit().await.context("Failed to commit comment deletion")?;

    tracing::info!("Deleted comment {} with {} reply(ies)", id, deleted.saturating_sub(1));
    Ok(deleted)
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        body: row.get("body"),
        disabled: row.get("disabled"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn delete_subtree_mysql(pool: &MySqlPool, id: i64) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows: Vec<(i64, i64)> = sqlx::query(SUBTREE_IDS_SQL)
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to collect comment replies")?
        .iter()
        .map(|row| (row.get("id"), row.get("depth")))
        .collect();

    if rows.is_empty() {
        return Ok(0);
    }

    let mut deleted: u64 = 0;
    for batch in delete_batches(&rows) {
        let sql = delete_ids_sql(batch.len());
        let mut query = sqlx::query(&sql);
        for id in &batch {
            query = query.bind(*id);
        }
        deleted += query
            .execute(&mut *tx)
            .await
            .context("Failed to delete comments")?
            .rows_affected();
    }

    tx.commit().await.context("Failed to commit comment deletion")?;

    tracing::info!("Deleted comment {} with {} reply(ies)", id, deleted.saturating_sub(1));
    Ok(deleted)
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    Ok(Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        body: row.get("body"),
        disabled: row.get("disabled"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
