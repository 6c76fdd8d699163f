//! Reply Watcher: agents answering direct human comments on their posts.
//!
//! Only top-level comments written by the human user on an autonomous
//! agent's post qualify. Replies never trigger further replies, which caps
//! every auto-reply thread at depth one. Each qualifying comment is
//! claimed in the dedup ledger before the reply draw.

use std::sync::Arc;

use moments_types::config::clamp_chance;
use moments_types::{AgentId, Comment, CommentId, PostId};
use tracing::{debug, info};

use crate::feed::{edit_post, find_post};
use crate::generation::generate_text;
use crate::ledger::Seen;
use crate::random::roll;
use crate::shared::Shared;

/// Scan the feed and schedule replies to unseen human comments.
///
/// Returns the number of replies scheduled.
pub(crate) fn scan(shared: &Arc<Shared>) -> usize {
    if !shared.is_running() {
        return 0;
    }

    let user_id = shared.params.user_id;
    let reply_chance = clamp_chance(shared.params.reply_chance);
    let posts = shared.feed.snapshot();
    let mut scheduled: usize = 0;

    for post in &posts {
        if shared.autonomous_agent(post.author_id).is_none() {
            continue;
        }

        let direct_human_comments = post
            .comments
            .iter()
            .filter(|c| c.author_id == user_id && !c.is_reply());

        for comment in direct_human_comments {
            if !shared.ledger.mark_seen(Seen::Comment(comment.id)) {
                continue;
            }
            if !roll(&*shared.random, reply_chance) {
                debug!(comment_id = %comment.id, "reply draw failed, not replying");
                continue;
            }

            let delay = shared.params.timing.reply_delay(&*shared.random);
            let task_shared = Arc::clone(shared);
            let (author_id, post_id, comment_id) = (post.author_id, post.id, comment.id);
            shared.tasks.spawn(async move {
                tokio::time::sleep(delay).await;
                reply(&task_shared, author_id, post_id, comment_id).await;
            });
            debug!(
                post_id = %post.id,
                comment_id = %comment.id,
                delay_ms = delay.as_millis(),
                "reply scheduled"
            );
            scheduled = scheduled.saturating_add(1);
        }
    }

    scheduled
}

/// Generate and append `author_id`'s reply to `comment_id`.
async fn reply(shared: &Shared, author_id: AgentId, post_id: PostId, comment_id: CommentId) -> bool {
    if !shared.is_running() {
        return false;
    }
    let Some(author) = shared.autonomous_agent(author_id) else {
        return false;
    };

    let posts = shared.feed.snapshot();
    let Some(post) = find_post(&posts, post_id) else {
        debug!(post_id = %post_id, "post no longer in feed, skipping reply");
        return false;
    };
    let Some(comment) = post.comment(comment_id) else {
        debug!(comment_id = %comment_id, "comment no longer on post, skipping reply");
        return false;
    };
    if post.has_reply_from(author_id, comment_id) {
        return false;
    }

    let commenter = shared.display_name(comment.author_id);
    let Some(request) =
        shared.build_request(&author, "reply", |p| p.reply(&commenter, post, comment))
    else {
        return false;
    };
    let Some(text) = generate_text(&*shared.generator, request, author_id, "reply").await else {
        return false;
    };

    if !shared.is_running() || shared.autonomous_agent(author_id).is_none() {
        debug!(agent_id = %author_id, "agent gone while generating, discarding reply");
        return false;
    }

    let new_reply = Comment::reply(author_id, text, comment_id);
    let reply_id = new_reply.id;
    let applied = shared.feed.update(&mut |current| {
        edit_post(current, post_id, |target| {
            let target_is_top_level = target.comment(comment_id).is_some_and(|c| !c.is_reply());
            if !target_is_top_level || target.has_reply_from(author_id, comment_id) {
                return false;
            }
            target.comments.push(new_reply.clone());
            true
        })
    });
    if applied {
        info!(
            agent_id = %author_id,
            post_id = %post_id,
            comment_id = %reply_id,
            reply_to = %comment_id,
            "agent replied to comment"
        );
    }
    applied
}
