//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles persistence for one entity.

pub mod comment;
pub mod post;
pub mod tag;
pub mod user;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
