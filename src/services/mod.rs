//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They are
//! responsible for:
//! - Implementing business rules (publication, navigation, threading)
//! - Validation and error mapping
//! - Slug generation and uniqueness

pub mod comment;
pub mod post;
pub mod slug;
pub mod tag;

pub use comment::{CommentService, CommentServiceError};
pub use post::{PostService, PostServiceError, DEFAULT_SIMILAR_ARTICLES_LIMIT};
pub use slug::{generate_slug, is_valid_slug};
pub use tag::{TagService, TagServiceError};
