//! Comment model
//!
//! Comments belong to a post and may reply to another comment on the same
//! post through `parent_id`. Replies are deleted together with their parent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    /// Comment this one replies to, if any
    pub parent_id: Option<i64>,
    pub body: String,
    /// Disabled comments and their replies are hidden from public threads
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Input for creating a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub body: String,
}

impl CreateCommentInput {
    pub fn new(post_id: i64, author_id: i64, body: impl Into<String>) -> Self {
        Self {
            post_id,
            author_id,
            parent_id: None,
            body: body.into(),
        }
    }

    /// Make this comment a reply to `parent_id`
    pub fn replying_to(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// A comment with its visible replies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn new(comment: Comment) -> Self {
        Self {
            comment,
            replies: Vec::new(),
        }
    }

    /// Count of this comment plus all nested replies
    pub fn total_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.replies.iter());
        }
        count
    }

    /// Build the public thread for a post from its flat comment list.
    ///
    /// Sibling order follows the input order. Disabled comments are dropped
    /// together with everything below them, and so are comments whose
    /// parent is not in `comments`. Works without recursion, so reply
    /// depth is unbounded.
    pub fn build_thread(comments: Vec<Comment>) -> Vec<CommentNode> {
        let mut children: HashMap<Option<i64>, Vec<Comment>> = HashMap::new();
        for comment in comments.into_iter().filter(|c| !c.disabled) {
            children.entry(comment.parent_id).or_default().push(comment);
        }

        // Pre-order walk from the top level; siblings keep input order
        let mut order = Vec::new();
        let mut stack: Vec<Comment> = children.remove(&None).unwrap_or_default();
        stack.reverse();
        while let Some(comment) = stack.pop() {
            if let Some(replies) = children.remove(&Some(comment.id)) {
                stack.extend(replies.into_iter().rev());
            }
            order.push(comment);
        }

        // Reverse pre-order sees every reply before its parent
        let mut built: HashMap<Option<i64>, Vec<CommentNode>> = HashMap::new();
        for comment in order.into_iter().rev() {
            let mut replies = built.remove(&Some(comment.id)).unwrap_or_default();
            replies.reverse();
            built
                .entry(comment.parent_id)
                .or_default()
                .push(CommentNode { comment, replies });
        }

        let mut thread = built.remove(&None).unwrap_or_default();
        thread.reverse();
        thread
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64, parent_id: Option<i64>, disabled: bool) -> Comment {
        let now = Utc::now();
        Comment {
            id,
            post_id: 1,
            author_id: 1,
            parent_id,
            body: format!("comment {}", id),
            disabled,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_comment_input_reply() {
        let input = CreateCommentInput::new(3, 4, "hello").replying_to(9);

        assert_eq!(input.post_id, 3);
        assert_eq!(input.author_id, 4);
        assert_eq!(input.parent_id, Some(9));
        assert_eq!(input.body, "hello");
    }

    #[test]
    fn test_build_thread_nests_replies_in_input_order() {
        let comments = vec![
            comment(4, Some(1), false),
            comment(3, None, false),
            comment(2, Some(1), false),
            comment(1, None, false),
            comment(5, Some(4), false),
        ];

        let thread = CommentNode::build_thread(comments);

        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].comment.id, 3);
        assert_eq!(thread[1].comment.id, 1);

        let replies: Vec<i64> = thread[1].replies.iter().map(|n| n.comment.id).collect();
        assert_eq!(replies, vec![4, 2]);
        assert_eq!(thread[1].replies[0].replies[0].comment.id, 5);
        assert_eq!(thread[1].total_count(), 4);
    }

    #[test]
    fn test_build_thread_hides_disabled_subtree() {
        let comments = vec![
            comment(1, None, false),
            comment(2, Some(1), true),
            comment(3, Some(2), false),
            comment(4, Some(1), false),
        ];

        let thread = CommentNode::build_thread(comments);

        assert_eq!(thread.len(), 1);
        let replies: Vec<i64> = thread[0].replies.iter().map(|n| n.comment.id).collect();
        assert_eq!(replies, vec![4]);
        assert_eq!(thread[0].total_count(), 2);
    }

    #[test]
    fn test_build_thread_handles_deep_chains() {
        const DEPTH: i64 = 5_000;
        let comments: Vec<Comment> = (1..=DEPTH)
            .map(|id| comment(id, (id > 1).then(|| id - 1), false))
            .collect();

        let thread = CommentNode::build_thread(comments);

        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].total_count(), DEPTH as usize);

        let mut node = &thread[0];
        let mut expected = 1;
        while let Some(reply) = node.replies.first() {
            expected += 1;
            assert_eq!(reply.comment.id, expected);
            node = reply;
        }
        assert_eq!(expected, DEPTH);

        // Dismantle without deep recursive drops
        let mut pending = thread;
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }

    #[test]
    fn test_build_thread_drops_orphans() {
        let comments = vec![comment(1, None, false), comment(2, Some(99), false)];

        let thread = CommentNode::build_thread(comments);

        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].total_count(), 1);
    }

    #[test]
    fn test_build_thread_empty() {
        assert!(CommentNode::build_thread(Vec::new()).is_empty());
    }
}
