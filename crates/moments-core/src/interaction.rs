//! Interaction Engine: one reactor evaluating one post.
//!
//! Two independent draws, like then comment. Each is gated on the
//! reactor's current config and on a qualify check (not already liked,
//! no top-level comment yet) that is repeated inside the feed update, so
//! invoking the engine twice for the same pair can never duplicate a like
//! or a comment. When both fire, the comment follows the like after a
//! short pause.

use std::sync::Arc;

use moments_types::{Agent, AgentId, Comment, Post, PostId};
use tracing::{debug, info};

use crate::feed::{edit_post, find_post};
use crate::generation::generate_text;
use crate::random::roll;
use crate::shared::Shared;

/// What one invocation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionOutcome {
    /// A like was added.
    pub liked: bool,
    /// A top-level comment was added.
    pub commented: bool,
}

/// Evaluate `post_id` on behalf of `agent_id`.
pub(crate) async fn interact(
    shared: &Arc<Shared>,
    agent_id: AgentId,
    post_id: PostId,
) -> InteractionOutcome {
    let mut outcome = InteractionOutcome::default();
    if !shared.is_running() {
        return outcome;
    }

    let Some(agent) = shared.autonomous_agent(agent_id) else {
        debug!(agent_id = %agent_id, "not an autonomous agent, skipping reaction");
        return outcome;
    };
    let Some(post) = find_post(&shared.feed.snapshot(), post_id).cloned() else {
        debug!(post_id = %post_id, "post no longer in feed, skipping reaction");
        return outcome;
    };
    if post.author_id == agent_id {
        return outcome;
    }

    let config = shared.config();

    if config.likes_for(agent_id)
        && !post.is_liked_by(agent_id)
        && roll(&*shared.random, config.like_chance())
    {
        outcome.liked = apply_like(shared, agent_id, post_id);
    }

    if config.comments_for(agent_id)
        && !post.has_top_level_comment_by(agent_id)
        && roll(&*shared.random, config.comment_chance())
    {
        if outcome.liked {
            let pause = shared.params.timing.follow_up_delay(&*shared.random);
            tokio::time::sleep(pause).await;
        }
        outcome.commented = comment(shared, &agent, &post).await;
    }

    outcome
}

/// Append a like unless the agent already liked the post.
fn apply_like(shared: &Shared, agent_id: AgentId, post_id: PostId) -> bool {
    let applied = shared.feed.update(&mut |posts| {
        edit_post(posts, post_id, |post| {
            if post.is_liked_by(agent_id) {
                return false;
            }
            post.likes.push(agent_id);
            true
        })
    });
    if applied {
        info!(agent_id = %agent_id, post_id = %post_id, "agent liked post");
    }
    applied
}

/// Generate and append a top-level comment.
async fn comment(shared: &Shared, agent: &Agent, post: &Post) -> bool {
    let author = shared.display_name(post.author_id);
    let Some(request) = shared.build_request(agent, "comment", |p| p.comment(&author, post)) else {
        return false;
    };
    let Some(text) = generate_text(&*shared.generator, request, agent.id, "comment").await else {
        return false;
    };

    if !shared.is_running() || !shared.config().comments_for(agent.id) {
        debug!(agent_id = %agent.id, "commenting disabled while generating, discarding comment");
        return false;
    }

    let new_comment = Comment::top_level(agent.id, text);
    let comment_id = new_comment.id;
    let applied = shared.feed.update(&mut |posts| {
        edit_post(posts, post.id, |target| {
            if target.has_top_level_comment_by(agent.id) {
                return false;
            }
            target.comments.push(new_comment.clone());
            true
        })
    });
    if applied {
        info!(
            agent_id = %agent.id,
            post_id = %post.id,
            comment_id = %comment_id,
            "agent commented on post"
        );
    } else {
        debug!(agent_id = %agent.id, post_id = %post.id, "comment no longer applicable, dropped");
    }
    applied
}
