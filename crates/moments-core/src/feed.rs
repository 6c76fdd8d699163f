//! The shared feed and its single update entry point.
//!
//! The feed is the only shared mutable resource in the subsystem. Every
//! writer goes through [`FeedStore::update`]: it receives the current
//! collection, computes the complete replacement, and hands it back. The
//! store applies the replacement atomically, so a like from one agent and
//! a comment from another in the same instant can never overwrite each
//! other. Qualify checks (already liked, already commented, comment still
//! exists) run inside the closure, against the state being replaced.

use std::sync::{Mutex, PoisonError};

use moments_types::{Comment, Post, PostId};
use tokio::sync::watch;

/// A store holding the ordered post collection (most recent first).
pub trait FeedStore: Send + Sync {
    /// A copy of the current collection.
    fn snapshot(&self) -> Vec<Post>;

    /// Replace the collection with the value computed by `apply`.
    ///
    /// `apply` sees the current collection and returns the full new
    /// collection, or `None` to leave the feed untouched. Returns `true` if
    /// a replacement was stored.
    fn update(&self, apply: &mut dyn FnMut(&[Post]) -> Option<Vec<Post>>) -> bool;

    /// Change notifications: the value is a revision counter bumped on
    /// every stored replacement.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

/// In-process feed backed by a mutex-guarded vector.
#[derive(Debug)]
pub struct InMemoryFeed {
    posts: Mutex<Vec<Post>>,
    revision: watch::Sender<u64>,
}

impl Default for InMemoryFeed {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InMemoryFeed {
    /// Create a feed seeded with `posts` (most recent first).
    pub fn new(posts: Vec<Post>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            posts: Mutex::new(posts),
            revision,
        }
    }

    /// Current revision counter.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Publish a post at the top of the feed (used by the human side).
    pub fn publish_post(&self, post: Post) {
        self.update(&mut |posts| Some(prepend(posts, post.clone())));
    }

    /// Append `comment` to `post_id`. Returns `false` if the post is gone.
    pub fn publish_comment(&self, post_id: PostId, comment: Comment) -> bool {
        self.update(&mut |posts| {
            edit_post(posts, post_id, |post| {
                post.comments.push(comment.clone());
                true
            })
        })
    }
}

impl FeedStore for InMemoryFeed {
    fn snapshot(&self) -> Vec<Post> {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, apply: &mut dyn FnMut(&[Post]) -> Option<Vec<Post>>) -> bool {
        {
            let mut posts = self.posts.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(next) = apply(&posts) else {
                return false;
            };
            *posts = next;
        }
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        true
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

/// `posts` with `post` inserted at the top.
pub fn prepend(posts: &[Post], post: Post) -> Vec<Post> {
    let mut next = Vec::with_capacity(posts.len().saturating_add(1));
    next.push(post);
    next.extend_from_slice(posts);
    next
}

/// Copy `posts`, run `edit` on the copy of `post_id`, and return the new
/// collection if the post exists and `edit` reported a change.
pub fn edit_post(
    posts: &[Post],
    post_id: PostId,
    edit: impl FnOnce(&mut Post) -> bool,
) -> Option<Vec<Post>> {
    let mut next = posts.to_vec();
    let post = next.iter_mut().find(|p| p.id == post_id)?;
    edit(post).then_some(next)
}

/// Find a post by id in a snapshot.
pub fn find_post(posts: &[Post], post_id: PostId) -> Option<&Post> {
    posts.iter().find(|p| p.id == post_id)
}
