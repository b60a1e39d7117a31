//! Post repository
//!
//! Database operations for posts, including the derived queries the blog
//! front end relies on: published listings, latest posts, previous/next
//! navigation and similar posts by shared tag.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Post, PostStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post as given (timestamps included) and return it with its ID
    async fn insert(&self, post: &Post) -> Result<Post>;

    /// Overwrite every mutable column of an existing post
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get post by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// Check whether a slug is taken, optionally ignoring one post
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Published posts, `published_at` then `created_at` descending
    async fn list_published(&self, params: &ListParams) -> Result<Vec<Post>>;

    /// Count published posts
    async fn count_published(&self) -> Result<i64>;

    /// Published posts carrying a tag, same order as `list_published`
    async fn list_published_by_tag(&self, tag_id: i64, params: &ListParams) -> Result<Vec<Post>>;

    /// Count published posts carrying a tag
    async fn count_published_by_tag(&self, tag_id: i64) -> Result<i64>;

    /// The `count` most recently created published posts, newest first
    async fn latest_published(&self, count: usize) -> Result<Vec<Post>>;

    /// Nearest published post created before `post`
    async fn previous_published(&self, post: &Post) -> Result<Option<Post>>;

    /// Nearest published post created after `post`
    async fn next_published(&self, post: &Post) -> Result<Option<Post>>;

    /// Published posts sharing at least one tag with `post_id`, newest first
    async fn similar_published(&self, post_id: i64, limit: usize) -> Result<Vec<Post>>;

    /// Delete a post with its comments and tag associations
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_COLUMNS: &str = "p.id, p.slug, p.title, p.featured_image, p.body, p.author_id, \
     p.is_draft, p.allow_comments, p.meta_description, p.meta_keywords, \
     p.published_at, p.created_at, p.updated_at";

const PUBLISHED_ORDER: &str = "ORDER BY p.published_at DESC, p.created_at DESC, p.id DESC";

fn select_posts(clause: &str) -> String {
    format!("SELECT {} FROM posts p {}", POST_COLUMNS, clause)
}

fn published_list_sql() -> String {
    select_posts(&format!("WHERE p.is_draft = 0 {} LIMIT ? OFFSET ?", PUBLISHED_ORDER))
}

fn published_by_tag_sql() -> String {
    select_posts(&format!(
        "WHERE p.is_draft = 0 \
         AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ?) \
         {} LIMIT ? OFFSET ?",
        PUBLISHED_ORDER
    ))
}

fn latest_sql() -> String {
    select_posts("WHERE p.is_draft = 0 ORDER BY p.created_at DESC, p.id DESC LIMIT ?")
}

// Ties on created_at are broken by id so navigation is a total order.
fn previous_sql() -> String {
    select_posts(
        "WHERE p.is_draft = 0 \
         AND (p.created_at < ? OR (p.created_at = ? AND p.id < ?)) \
         ORDER BY p.created_at DESC, p.id DESC LIMIT 1",
    )
}

fn next_sql() -> String {
    select_posts(
        "WHERE p.is_draft = 0 \
         AND (p.created_at > ? OR (p.created_at = ? AND p.id > ?)) \
         ORDER BY p.created_at ASC, p.id ASC LIMIT 1",
    )
}

fn similar_sql() -> String {
    select_posts(
        "WHERE p.is_draft = 0 AND p.id <> ? \
         AND EXISTS ( \
             SELECT 1 FROM post_tags pt \
             INNER JOIN post_tags own ON own.tag_id = pt.tag_id \
             WHERE pt.post_id = p.id AND own.post_id = ?) \
         ORDER BY p.created_at DESC, p.id DESC LIMIT ?",
    )
}

const INSERT_POST_SQL: &str = r#"
    INSERT INTO posts (slug, title, featured_image, body, author_id, is_draft, allow_comments,
                       meta_description, meta_keywords, published_at, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_POST_SQL: &str = r#"
    UPDATE posts
    SET slug = ?, title = ?, featured_image = ?, body = ?, is_draft = ?, allow_comments = ?,
        meta_description = ?, meta_keywords = ?, published_at = ?, updated_at = ?
    WHERE id = ?
"#;

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn insert(&self, post: &Post) -> Result<Post> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_insert_sqlite(sqlx::query(INSERT_POST_SQL), post)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create post")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => bind_insert_mysql(sqlx::query(INSERT_POST_SQL), post)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create post")?
                .last_insert_id() as i64,
        };

        Ok(Post { id, ..post.clone() })
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_update_sqlite(sqlx::query(UPDATE_POST_SQL), post)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update post")?
                .rows_affected(),
            DatabaseDriver::Mysql => bind_update_mysql(sqlx::query(UPDATE_POST_SQL), post)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update post")?
                .rows_affected(),
        };

        // MySQL reports zero affected rows when nothing changed, so re-read
        if affected == 0 && self.get_by_id(post.id).await?.is_none() {
            anyhow::bail!("Post {} not found", post.id);
        }
        Ok(post.clone())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = select_posts("WHERE p.id = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_one_post_sqlite(self.pool.sqlite()?, sqlx::query(&sql).bind(id)).await
            }
            DatabaseDriver::Mysql => {
                fetch_one_post_mysql(self.pool.mysql()?, sqlx::query(&sql).bind(id)).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let sql = select_posts("WHERE p.slug = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_one_post_sqlite(self.pool.sqlite()?, sqlx::query(&sql).bind(slug)).await
            }
            DatabaseDriver::Mysql => {
                fetch_one_post_mysql(self.pool.mysql()?, sqlx::query(&sql).bind(slug)).await
            }
        }
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM posts WHERE slug = ? AND id <> ?";
        // Ids start at 1, so 0 excludes nothing
        let exclude_id = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(slug)
                .bind(exclude_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check slug")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(slug)
                .bind(exclude_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check slug")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn list_published(&self, params: &ListParams) -> Result<Vec<Post>> {
        let sql = published_list_sql();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(&sql).bind(params.limit()).bind(params.offset());
                fetch_posts_sqlite(self.pool.sqlite()?, query).await
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(&sql).bind(params.limit()).bind(params.offset());
                fetch_posts_mysql(self.pool.mysql()?, query).await
            }
        }
    }

    async fn count_published(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM posts WHERE is_draft = 0";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count published posts")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count published posts")?
                .get("count"),
        };
        Ok(count)
    }

    async fn list_published_by_tag(&self, tag_id: i64, params: &ListParams) -> Result<Vec<Post>> {
        let sql = published_by_tag_sql();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(&sql)
                    .bind(tag_id)
                    .bind(params.limit())
                    .bind(params.offset());
                fetch_posts_sqlite(self.pool.sqlite()?, query).await
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(&sql)
                    .bind(tag_id)
                    .bind(params.limit())
                    .bind(params.offset());
                fetch_posts_mysql(self.pool.mysql()?, query).await
            }
        }
    }

    async fn count_published_by_tag(&self, tag_id: i64) -> Result<i64> {
        let sql = r#"
            SELECT COUNT(*) AS count
            FROM posts p
            INNER JOIN post_tags pt ON pt.post_id = p.id
            WHERE pt.tag_id = ? AND p.is_draft = 0
        "#;
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(tag_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count posts by tag")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(tag_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count posts by tag")?
                .get("count"),
        };
        Ok(count)
    }

    async fn latest_published(&self, count: usize) -> Result<Vec<Post>> {
        let sql = latest_sql();
        let limit = count as i64;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_posts_sqlite(self.pool.sqlite()?, sqlx::query(&sql).bind(limit)).await
            }
            DatabaseDriver::Mysql => {
                fetch_posts_mysql(self.pool.mysql()?, sqlx::query(&sql).bind(limit)).await
            }
        }
    }

    async fn previous_published(&self, post: &Post) -> Result<Option<Post>> {
        let sql = previous_sql();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(&sql)
                    .bind(post.created_at)
                    .bind(post.created_at)
                    .bind(post.id);
                fetch_one_post_sqlite(self.pool.sqlite()?, query).await
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(&sql)
                    .bind(post.created_at)
                    .bind(post.created_at)
                    .bind(post.id);
                fetch_one_post_mysql(self.pool.mysql()?, query).await
            }
        }
    }

    async fn next_published(&self, post: &Post) -> Result<Option<Post>> {
        let sql = next_sql();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(&sql)
                    .bind(post.created_at)
                    .bind(post.created_at)
                    .bind(post.id);
                fetch_one_post_sqlite(self.pool.sqlite()?, query).await
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(&sql)
                    .bind(post.created_at)
                    .bind(post.created_at)
                    .bind(post.id);
                fetch_one_post_mysql(self.pool.mysql()?, query).await
            }
        }
    }

    async fn similar_published(&self, post_id: i64, limit: usize) -> Result<Vec<Post>> {
        let sql = similar_sql();
        let limit = limit as i64;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(&sql).bind(post_id).bind(post_id).bind(limit);
                fetch_posts_sqlite(self.pool.sqlite()?, query).await
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(&sql).bind(post_id).bind(post_id).bind(limit);
                fetch_posts_mysql(self.pool.mysql()?, query).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.mysql()?, id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_insert_sqlite<'q>(query: SqliteQuery<'q>, post: &'q Post) -> SqliteQuery<'q> {
    query
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.featured_image)
        .bind(&post.body)
        .bind(post.author_id)
        .bind(post.is_draft())
        .bind(post.allow_comments)
        .bind(&post.meta_description)
        .bind(&post.meta_keywords)
        .bind(post.published_at)
        .bind(post.created_at)
        .bind(post.updated_at)
}

fn bind_update_sqlite<'q>(query: SqliteQuery<'q>, post: &'q Post) -> SqliteQuery<'q> {
    query
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.featured_image)
        .bind(&post.body)
        .bind(post.is_draft())
        .bind(post.allow_comments)
        .bind(&post.meta_description)
        .bind(&post.meta_keywords)
        .bind(post.published_at)
        .bind(post.updated_at)
        .bind(post.id)
}

async fn fetch_posts_sqlite(pool: &SqlitePool, query: SqliteQuery<'_>) -> Result<Vec<Post>> {
    let rows = query.fetch_all(pool).await.context("Failed to query posts")?;
    rows.iter().map(row_to_post_sqlite).collect()
}

async fn fetch_one_post_sqlite(pool: &SqlitePool, query: SqliteQuery<'_>) -> Result<Option<Post>> {
    let row = query.fetch_optional(pool).await.context("Failed to query post")?;
    row.map(|r| row_to_post_sqlite(&r)).transpose()
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let comments = sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post comments")?
        .rows_affected();

    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post tags")?;

    let deleted = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post")?
        .rows_affected();

    tx.commit().await.context("Failed to commit post deletion")?;

    if deleted > 0 {
        tracing::info!("Deleted post {} with {} comment(s)", id, comments);
    }
    Ok(deleted > 0)
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let is_draft: bool = row.get("is_draft");
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        featured_image: row.get("featured_image"),
        body: row.get("body"),
        author_id: row.get("author_id"),
        status: PostStatus::from_is_draft(is_draft),
        allow_comments: row.get("allow_comments"),
        meta_description: row.get("meta_description"),
        meta_keywords: row.get("meta_keywords"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

fn bind_insert_mysql<'q>(query: MySqlQuery<'q>, post: &'q Post) -> MySqlQuery<'q> {
    query
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.featured_image)
        .bind(&post.body)
        .bind(post.author_id)
        .bind(post.is_draft())
        .bind(post.allow_comments)
        .bind(&post.meta_description)
        .bind(&post.meta_keywords)
        .bind(post.published_at)
        .bind(post.created_at)
        .bind(post.updated_at)
}

fn bind_update_mysql<'q>(query: MySqlQuery<'q>, post: &'q Post) -> MySqlQuery<'q> {
    query
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.featured_image)
        .bind(&post.body)
        .bind(post.is_draft())
        .bind(post.allow_comments)
        .bind(&post.meta_description)
        .bind(&post.meta_keywords)
        .bind(post.published_at)
        .bind(post.updated_at)
        .bind(post.id)
}

async fn fetch_posts_mysql(pool: &MySqlPool, query: MySqlQuery<'_>) -> Result<Vec<Post>> {
    let rows = query.fetch_all(pool).await.context("Failed to query posts")?;
    rows.iter().map(row_to_post_mysql).collect()
}

async fn fetch_one_post_mysql(pool: &MySqlPool, query: MySqlQuery<'_>) -> Result<Option<Post>> {
    let row = query.fetch_optional(pool).await.context("Failed to query post")?;
    row.map(|r| row_to_post_mysql(&r)).transpose()
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let comments = sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post comments")?
        .rows_affected();

    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post tags")?;

    let deleted = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post")?
        .rows_affected();

    tx.commit().await.context("Failed to commit post deletion")?;

    if deleted > 0 {
        tracing::info!("Deleted post {} with {} comment(s)", id, comments);
    }
    Ok(deleted > 0)
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let is_draft: bool = row.get("is_draft");
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        featured_image: row.get("featured_image"),
        body: row.get("body"),
        author_id: row.get("author_id"),
        status: PostStatus::from_is_draft(is_draft),
        allow_comments: row.get("allow_comments"),
        meta_description: row.get("meta_description"),
        meta_keywords: row.get("meta_keywords"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxTagRepository, TagRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Tag;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author_id = sqlx::query("INSERT INTO users (username, email) VALUES ('author', '')")
            .execute(pool.sqlite().unwrap())
            .await
            .expect("Failed to create test user")
            .last_insert_rowid();

        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo, author_id)
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    /// A post created `minutes` after the base time
    fn make_post(slug: &str, author_id: i64, minutes: i64, published: bool) -> Post {
        let created = base_time() + Duration::minutes(minutes);
        let mut post = Post::new(slug.to_string(), slug.to_uppercase(), "Body".to_string(), author_id);
        post.created_at = created;
        post.updated_at = created;
        if published {
            post.publish();
            post.stamp_save(created);
        }
        post
    }

    fn slugs(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.slug.as_str()).collect()
    }

    #[tokio::test]
    async fn test_insert_and_get_post() {
        let (_pool, repo, author) = setup_test_repo().await;

        let mut post = make_post("hello", author, 0, true);
        post.featured_image = Some("blog/hello/cover.png".to_string());
        post.meta_keywords = Some("rust,blog".to_string());
        post.allow_comments = false;

        let created = repo.insert(&post).await.expect("Failed to insert post");
        assert!(created.id > 0);

        let fetched = repo.get_by_id(created.id).await.unwrap().expect("Post not found");
        assert_eq!(fetched, created);

        let by_slug = repo.get_by_slug("hello").await.unwrap().expect("Post not found");
        assert_eq!(by_slug.id, created.id);
        assert!(by_slug.is_published());
        assert!(!by_slug.allow_comments);
        assert_eq!(by_slug.published_at, Some(base_time()));

        assert!(repo.get_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_post() {
        let (_pool, repo, author) = setup_test_repo().await;
        let mut post = repo.insert(&make_post("draft", author, 0, false)).await.unwrap();

        post.title = "Edited".to_string();
        post.publish();
        post.stamp_save(base_time() + Duration::hours(1));
        repo.update(&post).await.expect("Failed to update post");

        let fetched = repo.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Edited");
        assert!(fetched.is_published());
        assert_eq!(fetched.published_at, Some(base_time() + Duration::hours(1)));
        assert_eq!(fetched.created_at, base_time());
    }

    #[tokio::test]
    async fn test_update_missing_post_fails() {
        let (_pool, repo, author) = setup_test_repo().await;
        let mut post = make_post("ghost", author, 0, false);
        post.id = 4242;

        assert!(repo.update(&post).await.is_err());
    }

    #[tokio::test]
    async fn test_exists_by_slug() {
        let (_pool, repo, author) = setup_test_repo().await;
        let post = repo.insert(&make_post("taken", author, 0, false)).await.unwrap();

        assert!(repo.exists_by_slug("taken", None).await.unwrap());
        assert!(!repo.exists_by_slug("taken", Some(post.id)).await.unwrap());
        assert!(!repo.exists_by_slug("free", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_published_excludes_drafts_and_paginates() {
        let (_pool, repo, author) = setup_test_repo().await;

        repo.insert(&make_post("one", author, 1, true)).await.unwrap();
        repo.insert(&make_post("two", author, 2, true)).await.unwrap();
        repo.insert(&make_post("draft", author, 3, false)).await.unwrap();
        repo.insert(&make_post("three", author, 4, true)).await.unwrap();

        assert_eq!(repo.count_published().await.unwrap(), 3);

        let page = repo.list_published(&ListParams::new(1, 2)).await.unwrap();
        assert_eq!(slugs(&page), vec!["three", "two"]);

        let page = repo.list_published(&ListParams::new(2, 2)).await.unwrap();
        assert_eq!(slugs(&page), vec!["one"]);
    }

    #[tokio::test]
    async fn test_list_published_by_tag() {
        let (pool, repo, author) = setup_test_repo().await;
        let tags = SqlxTagRepository::new(pool.clone());
        let rust = tags.create(&Tag::new("rust".to_string(), "Rust".to_string())).await.unwrap();

        let a = repo.insert(&make_post("a", author, 1, true)).await.unwrap();
        let b = repo.insert(&make_post("b", author, 2, false)).await.unwrap();
        repo.insert(&make_post("c", author, 3, true)).await.unwrap();
        tags.add_to_post(rust.id, a.id).await.unwrap();
        tags.add_to_post(rust.id, b.id).await.unwrap();

        let posts = repo.list_published_by_tag(rust.id, &ListParams::default()).await.unwrap();
        assert_eq!(slugs(&posts), vec!["a"]);
        assert_eq!(repo.count_published_by_tag(rust.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_latest_published() {
        let (_pool, repo, author) = setup_test_repo().await;

        assert!(repo.latest_published(5).await.unwrap().is_empty());

        for (i, published) in [true, true, false, true, true].into_iter().enumerate() {
            repo.insert(&make_post(&format!("p{}", i), author, i as i64, published))
                .await
                .unwrap();
        }

        let latest = repo.latest_published(3).await.unwrap();
        assert_eq!(slugs(&latest), vec!["p4", "p3", "p1"]);

        let all = repo.latest_published(10).await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(repo.latest_published(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_previous_and_next_skip_drafts() {
        let (_pool, repo, author) = setup_test_repo().await;

        let first = repo.insert(&make_post("first", author, 0, true)).await.unwrap();
        let draft = repo.insert(&make_post("draft", author, 1, false)).await.unwrap();
        let middle = repo.insert(&make_post("middle", author, 2, true)).await.unwrap();
        let last = repo.insert(&make_post("last", author, 3, true)).await.unwrap();

        assert!(repo.previous_published(&first).await.unwrap().is_none());
        assert_eq!(repo.next_published(&first).await.unwrap().unwrap().id, middle.id);
        assert_eq!(repo.previous_published(&middle).await.unwrap().unwrap().id, first.id);
        assert_eq!(repo.next_published(&middle).await.unwrap().unwrap().id, last.id);
        assert!(repo.next_published(&last).await.unwrap().is_none());

        // A draft still navigates to published neighbours
        assert_eq!(repo.previous_published(&draft).await.unwrap().unwrap().id, first.id);
        assert_eq!(repo.next_published(&draft).await.unwrap().unwrap().id, middle.id);
    }

    #[tokio::test]
    async fn test_previous_and_next_break_ties_by_id() {
        let (_pool, repo, author) = setup_test_repo().await;

        let a = repo.insert(&make_post("a", author, 0, true)).await.unwrap();
        let b = repo.insert(&make_post("b", author, 0, true)).await.unwrap();

        assert_eq!(repo.next_published(&a).await.unwrap().unwrap().id, b.id);
        assert_eq!(repo.previous_published(&b).await.unwrap().unwrap().id, a.id);
        assert!(repo.previous_published(&a).await.unwrap().is_none());
        assert!(repo.next_published(&b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_similar_published() {
        let (pool, repo, author) = setup_test_repo().await;
        let tags = SqlxTagRepository::new(pool.clone());
        let rust = tags.create(&Tag::new("rust".to_string(), "Rust".to_string())).await.unwrap();
        let web = tags.create(&Tag::new("web".to_string(), "Web".to_string())).await.unwrap();
        let other = tags.create(&Tag::new("other".to_string(), "Other".to_string())).await.unwrap();

        let subject = repo.insert(&make_post("subject", author, 0, true)).await.unwrap();
        let both = repo.insert(&make_post("both", author, 1, true)).await.unwrap();
        let one = repo.insert(&make_post("one", author, 2, true)).await.unwrap();
        let draft = repo.insert(&make_post("draft", author, 3, false)).await.unwrap();
        let unrelated = repo.insert(&make_post("unrelated", author, 4, true)).await.unwrap();

        tags.set_for_post(subject.id, &[rust.id, web.id]).await.unwrap();
        tags.set_for_post(both.id, &[rust.id, web.id]).await.unwrap();
        tags.set_for_post(one.id, &[web.id]).await.unwrap();
        tags.set_for_post(draft.id, &[rust.id]).await.unwrap();
        tags.set_for_post(unrelated.id, &[other.id]).await.unwrap();

        let similar = repo.similar_published(subject.id, 5).await.unwrap();
        assert_eq!(slugs(&similar), vec!["one", "both"]);

        let limited = repo.similar_published(subject.id, 1).await.unwrap();
        assert_eq!(slugs(&limited), vec!["one"]);

        assert!(repo.similar_published(unrelated.id, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_post_removes_comments_and_associations() {
        let (pool, repo, author) = setup_test_repo().await;
        let sqlite_pool = pool.sqlite().unwrap();
        let tags = SqlxTagRepository::new(pool.clone());
        let rust = tags.create(&Tag::new("rust".to_string(), "Rust".to_string())).await.unwrap();

        let post = repo.insert(&make_post("doomed", author, 0, true)).await.unwrap();
        tags.add_to_post(rust.id, post.id).await.unwrap();

        let parent = sqlx::query("INSERT INTO comments (post_id, author_id, body) VALUES (?, ?, 'top')")
            .bind(post.id)
            .bind(author)
            .execute(sqlite_pool)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO comments (post_id, author_id, parent_id, body) VALUES (?, ?, ?, 'reply')")
            .bind(post.id)
            .bind(author)
            .bind(parent)
            .execute(sqlite_pool)
            .await
            .unwrap();

        assert!(repo.delete(post.id).await.unwrap());
        assert!(!repo.delete(post.id).await.unwrap());

        let remaining: i64 = sqlx::query("SELECT COUNT(*) AS n FROM comments")
            .fetch_one(sqlite_pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(remaining, 0);
        assert_eq!(tags.size(rust.id).await.unwrap(), 0);
        assert!(tags.get_by_id(rust.id).await.unwrap().is_some());
    }
}
