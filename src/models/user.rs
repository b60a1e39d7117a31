//! Author model
//!
//! Authentication and account management live elsewhere; the blog only
//! needs enough of a user to attribute posts and comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user that can author posts and comments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    /// Unique login name
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User. The ID is assigned by the database.
    pub fn new(username: String, email: String) -> Self {
        Self {
            id: 0,
            username,
            email,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new("ada".to_string(), "ada@example.com".to_string());

        assert_eq!(user.id, 0);
        assert_eq!(user.username, "ada");
        assert_eq!(user.email, "ada@example.com");
    }
}
