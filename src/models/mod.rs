//! Data models
//!
//! Entities persisted by the blog (Post, Tag, Comment, User) plus the input
//! and pagination types used by services and the HTTP layer.

mod comment;
mod post;
mod tag;
mod user;

pub use comment::{Comment, CommentNode, CreateCommentInput};
pub use post::{
    featured_image_path, CreatePostInput, ListParams, PagedResult, Post, PostStatus,
    UpdatePostInput, META_DESCRIPTION_MAX_LEN, META_KEYWORDS_MAX_LEN, TITLE_MAX_LEN,
};
pub use tag::{Tag, TagWithSize, TAG_NAME_MAX_LEN};
pub use user::User;
