//! Dedup ledger: which posts and comments have already been evaluated.
//!
//! The Feed Watcher and Reply Watcher run on every feed notification, not
//! only when something genuinely new appears. The ledger makes them
//! idempotent: an id is claimed with [`DedupLedger::mark_seen`] *before*
//! any reaction is scheduled, and a claimed id is never handed out again
//! for the lifetime of the ledger, even if the post or comment is later
//! edited.
//!
//! The two id spaces are independent append-only sets. There is no
//! eviction; the feed is bounded by human usage, not external load.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use moments_types::{CommentId, PostId};

/// An entry in the ledger, tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seen {
    /// A post evaluated by the Feed Watcher.
    Post(PostId),
    /// A comment evaluated by the Reply Watcher.
    Comment(CommentId),
}

/// Process-lifetime record of processed post and comment ids.
#[derive(Debug, Default)]
pub struct DedupLedger {
    posts: Mutex<HashSet<PostId>>,
    comments: Mutex<HashSet<CommentId>>,
}

impl DedupLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `entry` has already been recorded.
    pub fn has_seen(&self, entry: Seen) -> bool {
        match entry {
            Seen::Post(id) => self
                .posts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&id),
            Seen::Comment(id) => self
                .comments
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&id),
        }
    }

    /// Record `entry` as processed.
    ///
    /// Returns `true` if this call claimed the entry, `false` if it was
    /// already recorded. Check and insert happen under one lock, so exactly
    /// one caller ever wins a given id.
    pub fn mark_seen(&self, entry: Seen) -> bool {
        match entry {
            Seen::Post(id) => self
                .posts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id),
            Seen::Comment(id) => self
                .comments
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id),
        }
    }

    /// Number of recorded posts.
    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of recorded comments.
    pub fn comment_count(&self) -> usize {
        self.comments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_claims_exactly_once() {
        let ledger = DedupLedger::new();
        let post = PostId::new();
        assert!(!ledger.has_seen(Seen::Post(post)));
        assert!(ledger.mark_seen(Seen::Post(post)));
        assert!(!ledger.mark_seen(Seen::Post(post)));
        assert!(ledger.has_seen(Seen::Post(post)));
        assert_eq!(ledger.post_count(), 1);
    }

    #[test]
    fn post_and_comment_spaces_are_independent() {
        let ledger = DedupLedger::new();
        let post = PostId::new();
        let comment = CommentId::from(post.into_inner());

        assert!(ledger.mark_seen(Seen::Post(post)));
        assert!(!ledger.has_seen(Seen::Comment(comment)));
        assert!(ledger.mark_seen(Seen::Comment(comment)));
        assert_eq!(ledger.post_count(), 1);
        assert_eq!(ledger.comment_count(), 1);
    }
}
