//! Feed entities: agents, posts, and comments.
//!
//! Posts and comments are plain values. The scheduler never mutates a
//! shared post in place; it clones the collection, edits the clone, and
//! hands the whole replacement back to the feed store. The helpers here
//! are the qualify checks used right before such an edit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{AgentId, CommentId, PostId};

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A persona that can post, like, and comment.
///
/// Agents are owned by the contact-management side of the application and
/// are read-only to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Agent {
    /// Stable identifier.
    pub id: AgentId,
    /// Display name, always included in the generation persona.
    pub name: String,
    /// Free-form personality and interest text fed to generation.
    #[serde(default)]
    pub personality: String,
    /// `true` for a real person. Human agents are never driven by the
    /// scheduler.
    #[serde(default)]
    pub is_human: bool,
}

impl Agent {
    /// Create an autonomous agent.
    pub fn autonomous(name: impl Into<String>, personality: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            personality: personality.into(),
            is_human: false,
        }
    }

    /// Create a human agent with the given identifier.
    pub fn human(id: AgentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            personality: String::new(),
            is_human: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A comment on a post.
///
/// Threads are one level deep: a reply points at a top-level comment on the
/// same post and is never itself replied to by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Comment {
    /// Unique identifier.
    pub id: CommentId,
    /// The commenting agent.
    pub author_id: AgentId,
    /// Comment text.
    pub content: String,
    /// The comment this one answers, if it is a reply.
    #[serde(default)]
    pub reply_to: Option<CommentId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Create a top-level comment.
    pub fn top_level(author_id: AgentId, content: impl Into<String>) -> Self {
        Self {
            id: CommentId::new(),
            author_id,
            content: content.into(),
            reply_to: None,
            created_at: Utc::now(),
        }
    }

    /// Create a reply to `reply_to`.
    pub fn reply(author_id: AgentId, content: impl Into<String>, reply_to: CommentId) -> Self {
        Self {
            id: CommentId::new(),
            author_id,
            content: content.into(),
            reply_to: Some(reply_to),
            created_at: Utc::now(),
        }
    }

    /// Whether this comment answers another comment.
    pub const fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A post in the shared feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Post {
    /// Unique identifier.
    pub id: PostId,
    /// The posting agent.
    pub author_id: AgentId,
    /// Post text.
    pub content: String,
    /// Agents who liked the post, in like order. Never contains duplicates.
    #[serde(default)]
    pub likes: Vec<AgentId>,
    /// Comments and replies, in creation order.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a fresh post with no likes or comments.
    pub fn new(author_id: AgentId, content: impl Into<String>) -> Self {
        Self {
            id: PostId::new(),
            author_id,
            content: content.into(),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether `agent_id` already appears in the likes list.
    pub fn is_liked_by(&self, agent_id: AgentId) -> bool {
        self.likes.contains(&agent_id)
    }

    /// Whether `agent_id` already left a top-level (non-reply) comment.
    pub fn has_top_level_comment_by(&self, agent_id: AgentId) -> bool {
        self.comments
            .iter()
            .any(|c| c.author_id == agent_id && !c.is_reply())
    }

    /// Look up a comment on this post.
    pub fn comment(&self, comment_id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    /// Whether `author_id` already replied to `comment_id` on this post.
    pub fn has_reply_from(&self, author_id: AgentId, comment_id: CommentId) -> bool {
        self.comments
            .iter()
            .any(|c| c.author_id == author_id && c.reply_to == Some(comment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_comment_detection_ignores_replies() {
        let author = AgentId::new();
        let agent = AgentId::new();
        let mut post = Post::new(author, "sunset at the pier");

        let root = Comment::top_level(author, "first!");
        let root_id = root.id;
        post.comments.push(root);
        post.comments.push(Comment::reply(agent, "nice", root_id));

        assert!(!post.has_top_level_comment_by(agent));
        assert!(post.has_top_level_comment_by(author));
        assert!(post.has_reply_from(agent, root_id));
        assert!(!post.has_reply_from(author, root_id));
    }

    #[test]
    fn like_lookup() {
        let mut post = Post::new(AgentId::new(), "coffee");
        let fan = AgentId::new();
        assert!(!post.is_liked_by(fan));
        post.likes.push(fan);
        assert!(post.is_liked_by(fan));
    }

    #[test]
    fn post_json_uses_camel_case_and_defaults() {
        let author = AgentId::new();
        let json = serde_json::json!({
            "id": PostId::new(),
            "authorId": author,
            "content": "hello",
            "createdAt": "2026-01-01T00:00:00Z"
        });
        let post: Result<Post, _> = serde_json::from_value(json);
        assert!(post.is_ok());
        let post = post.unwrap_or_else(|_| Post::new(AgentId::new(), ""));
        assert_eq!(post.author_id, author);
        assert!(post.likes.is_empty());
        assert!(post.comments.is_empty());
    }
}
