//! Comment service
//!
//! Threaded comments on posts. A reply's parent must live on the same post,
//! and re-parenting may never create a cycle.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentNode, CreateCommentInput};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Comment or post not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The post does not accept comments
    #[error("Comments are closed for post {0}")]
    CommentsClosed(i64),

    /// Parent is missing, on another post, or would create a cycle
    #[error("Invalid parent comment: {0}")]
    InvalidParent(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { repo, posts }
    }

    /// Create a comment or a reply
    ///
    /// # Errors
    /// - `ValidationError` if the body is empty
    /// - `NotFound` if the post doesn't exist
    /// - `CommentsClosed` if the post doesn't allow comments
    /// - `InvalidParent` if the parent is missing or belongs to another post
    pub async fn create(&self, input: CreateCommentInput) -> Result<Comment, CommentServiceError> {
        if input.body.trim().is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment body cannot be empty".to_string(),
            ));
        }

        let post = self
            .posts
            .get_by_id(input.post_id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| {
                CommentServiceError::NotFound(format!("Post with ID {} not found", input.post_id))
            })?;

        if !post.allow_comments {
            return Err(CommentServiceError::CommentsClosed(post.id));
        }

        if let Some(parent_id) = input.parent_id {
            self.check_parent(parent_id, post.id).await?;
        }

        let comment = self
            .repo
            .create(&input)
            .await
            .context("Failed to create comment")?;

        tracing::debug!("Created comment {} on post {}", comment.id, comment.post_id);
        Ok(comment)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Comment>, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")
            .map_err(Into::into)
    }

    /// Every comment on a post, disabled ones included, newest first
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, CommentServiceError> {
        self.repo
            .list_by_post(post_id)
            .await
            .context("Failed to list comments")
            .map_err(Into::into)
    }

    /// Public thread for a post: newest first at every level, disabled
    /// comments and their replies left out
    pub async fn thread(&self, post_id: i64) -> Result<Vec<CommentNode>, CommentServiceError> {
        let comments = self.list_for_post(post_id).await?;
        Ok(CommentNode::build_thread(comments))
    }

    /// Move a comment under a new parent, or to the top level with `None`
    ///
    /// # Errors
    /// - `NotFound` if the comment doesn't exist
    /// - `InvalidParent` if the parent is missing, on another post, or is
    ///   the comment itself or one of its replies
    pub async fn reparent(
        &self,
        id: i64,
        parent_id: Option<i64>,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self.require(id).await?;

        if let Some(parent_id) = parent_id {
            let parent = self.check_parent(parent_id, comment.post_id).await?;
            self.check_no_cycle(comment.id, parent).await?;
        }

        self.repo
            .set_parent(id, parent_id)
            .await
            .context("Failed to update comment parent")?;

        self.require(id).await
    }

    /// Enable or disable a comment
    pub async fn set_disabled(&self, id: i64, disabled: bool) -> Result<Comment, CommentServiceError> {
        if !self
            .repo
            .set_disabled(id, disabled)
            .await
            .context("Failed to update comment")?
        {
            return Err(not_found(id));
        }
        self.require(id).await
    }

    /// Delete a comment and all of its replies; returns how many were removed
    pub async fn delete(&self, id: i64) -> Result<u64, CommentServiceError> {
        let removed = self
            .repo
            .delete_subtree(id)
            .await
            .context("Failed to delete comment")?;

        if removed == 0 {
            return Err(not_found(id));
        }
        Ok(removed)
    }

    async fn require(&self, id: i64) -> Result<Comment, CommentServiceError> {
        self.get_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    async fn check_parent(&self, parent_id: i64, post_id: i64) -> Result<Comment, CommentServiceError> {
        let parent = self.get_by_id(parent_id).await?.ok_or_else(|| {
            CommentServiceError::InvalidParent(format!("Comment {} does not exist", parent_id))
        })?;

        if parent.post_id != post_id {
            return Err(CommentServiceError::InvalidParent(format!(
                "Comment {} belongs to another post",
                parent_id
            )));
        }

        Ok(parent)
    }

    /// Walk up from `parent` and fail if `id` is among its ancestors
    async fn check_no_cycle(&self, id: i64, parent: Comment) -> Result<(), CommentServiceError> {
        let mut seen = HashSet::new();
        let mut current = Some(parent);

        while let Some(node) = current {
            if node.id == id {
                return Err(CommentServiceError::InvalidParent(format!(
                    "Comment {} cannot be moved under itself or its replies",
                    id
                )));
            }
            if !seen.insert(node.id) {
                break;
            }
            current = match node.parent_id {
                Some(pid) => self.get_by_id(pid).await?,
                None => None,
            };
        }

        Ok(())
    }
}

fn not_found(id: i64) -> CommentServiceError {
    CommentServiceError::NotFound(format!("Comment with ID {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCommentRepository, SqlxPostRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{Post, User};

    struct Fixture {
        _pool: DynDatabasePool,
        service: CommentService,
        posts: Arc<dyn PostRepository>,
        author: i64,
    }

    async fn setup_test_service() -> Fixture {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = SqlxUserRepository::new(pool.clone())
            .create(&User::new("reader".to_string(), String::new()))
            .await
            .expect("Failed to create test user")
            .id;

        let posts = SqlxPostRepository::boxed(pool.clone());
        let service = CommentService::new(SqlxCommentRepository::boxed(pool.clone()), posts.clone());
        Fixture {
            _pool: pool,
            service,
            posts,
            author,
        }
    }

    async fn create_post(fx: &Fixture, slug: &str, allow_comments: bool) -> i64 {
        let mut post = Post::new(slug.to_string(), slug.to_string(), "body".to_string(), fx.author);
        post.allow_comments = allow_comments;
        fx.posts.insert(&post).await.expect("Failed to create post").id
    }

    async fn comment(fx: &Fixture, post_id: i64, parent: Option<i64>) -> Comment {
        let mut input = CreateCommentInput::new(post_id, fx.author, "hello");
        if let Some(parent) = parent {
            input = input.replying_to(parent);
        }
        fx.service.create(input).await.expect("Failed to create comment")
    }

    #[tokio::test]
    async fn test_create_comment_and_reply() {
        let fx = setup_test_service().await;
        let post = create_post(&fx, "open", true).await;

        let root = comment(&fx, post, None).await;
        let reply = comment(&fx, post, Some(root.id)).await;

        assert!(!root.is_reply());
        assert_eq!(reply.parent_id, Some(root.id));
        assert!(!reply.disabled);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_body() {
        let fx = setup_test_service().await;
        let post = create_post(&fx, "open", true).await;

        let result = fx.service.create(CreateCommentInput::new(post, fx.author, "  ")).await;
        assert!(matches!(result, Err(CommentServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_on_closed_or_missing_post() {
        let fx = setup_test_service().await;
        let closed = create_post(&fx, "closed", false).await;

        let result = fx.service.create(CreateCommentInput::new(closed, fx.author, "hi")).await;
        assert!(matches!(result, Err(CommentServiceError::CommentsClosed(id)) if id == closed));

        let result = fx.service.create(CreateCommentInput::new(404, fx.author, "hi")).await;
        assert!(matches!(result, Err(CommentServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_parent_must_exist_on_same_post() {
        let fx = setup_test_service().await;
        let first = create_post(&fx, "first", true).await;
        let second = create_post(&fx, "second", true).await;
        let other = comment(&fx, second, None).await;

        let cross = CreateCommentInput::new(first, fx.author, "reply").replying_to(other.id);
        assert!(matches!(
            fx.service.create(cross).await,
            Err(CommentServiceError::InvalidParent(_))
        ));

        let missing = CreateCommentInput::new(first, fx.author, "reply").replying_to(999);
        assert!(matches!(
            fx.service.create(missing).await,
            Err(CommentServiceError::InvalidParent(_))
        ));
    }

    #[tokio::test]
    async fn test_reparent_rejects_cycles() {
        let fx = setup_test_service().await;
        let post = create_post(&fx, "tree", true).await;
        let root = comment(&fx, post, None).await;
        let child = comment(&fx, post, Some(root.id)).await;
        let grandchild = comment(&fx, post, Some(child.id)).await;

        assert!(matches!(
            fx.service.reparent(root.id, Some(root.id)).await,
            Err(CommentServiceError::InvalidParent(_))
        ));
        assert!(matches!(
            fx.service.reparent(root.id, Some(grandchild.id)).await,
            Err(CommentServiceError::InvalidParent(_))
        ));

        let moved = fx.service.reparent(grandchild.id, Some(root.id)).await.unwrap();
        assert_eq!(moved.parent_id, Some(root.id));

        let top = fx.service.reparent(child.id, None).await.unwrap();
        assert_eq!(top.parent_id, None);
    }

    #[tokio::test]
    async fn test_thread_hides_disabled_subtrees() {
        let fx = setup_test_service().await;
        let post = create_post(&fx, "thread", true).await;
        let visible = comment(&fx, post, None).await;
        let hidden = comment(&fx, post, None).await;
        comment(&fx, post, Some(hidden.id)).await;
        let reply = comment(&fx, post, Some(visible.id)).await;

        fx.service.set_disabled(hidden.id, true).await.unwrap();

        let thread = fx.service.thread(post).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].comment.id, visible.id);
        assert_eq!(thread[0].replies.len(), 1);
        assert_eq!(thread[0].replies[0].comment.id, reply.id);

        // Disabled comments are still stored
        assert_eq!(fx.service.list_for_post(post).await.unwrap().len(), 4);

        let enabled = fx.service.set_disabled(hidden.id, false).await.unwrap();
        assert!(!enabled.disabled);
        assert_eq!(fx.service.thread(post).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_subtree() {
        let fx = setup_test_service().await;
        let post = create_post(&fx, "cleanup", true).await;
        let root = comment(&fx, post, None).await;
        let child = comment(&fx, post, Some(root.id)).await;
        comment(&fx, post, Some(child.id)).await;
        let sibling = comment(&fx, post, None).await;

        let removed = fx.service.delete(root.id).await.unwrap();
        assert_eq!(removed, 3);

        let remaining = fx.service.list_for_post(post).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, sibling.id);

        assert!(matches!(
            fx.service.delete(root.id).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_disabled_missing_comment() {
        let fx = setup_test_service().await;

        assert!(matches!(
            fx.service.set_disabled(77, true).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }
}
