//! Feed Watcher: turns newly appeared posts into delayed reactions.
//!
//! Runs on every feed notification. Each post id is claimed in the dedup
//! ledger before anything is scheduled, so a notification storm (or a slow
//! reaction that mutates the post mid-flight) never schedules the same
//! post twice.
//!
//! A reactor is eligible for a post when it is listed for likes or
//! comments (with the matching master switch on), is an autonomous agent,
//! is not the post's author, and is acquainted with the author. Human
//! posts are therefore reacted to exactly when some reactor counts the
//! user among its acquaintances.

use std::sync::Arc;

use moments_types::{AgentId, Post, SchedulerConfig};
use tracing::debug;

use crate::interaction;
use crate::ledger::Seen;
use crate::shared::Shared;

/// Scan the feed and schedule reactions for unseen posts.
///
/// Returns the number of reactions scheduled.
pub(crate) fn scan(shared: &Arc<Shared>) -> usize {
    if !shared.is_running() {
        return 0;
    }

    let posts = shared.feed.snapshot();
    let config = shared.config();
    let mut scheduled: usize = 0;

    for post in &posts {
        if !shared.ledger.mark_seen(Seen::Post(post.id)) {
            continue;
        }

        let reactors = eligible_reactors(shared, &config, post);
        if reactors.is_empty() {
            debug!(post_id = %post.id, "new post has no eligible reactors");
            continue;
        }

        for (index, reactor) in reactors.into_iter().enumerate() {
            let delay = shared.params.timing.reaction_delay(&*shared.random, index);
            let task_shared = Arc::clone(shared);
            let post_id = post.id;
            shared.tasks.spawn(async move {
                tokio::time::sleep(delay).await;
                interaction::interact(&task_shared, reactor, post_id).await;
            });
            debug!(
                post_id = %post.id,
                agent_id = %reactor,
                delay_ms = delay.as_millis(),
                "reaction scheduled"
            );
            scheduled = scheduled.saturating_add(1);
        }
    }

    scheduled
}

/// Reactors for `post`, in a stable order.
pub(crate) fn eligible_reactors(
    shared: &Shared,
    config: &SchedulerConfig,
    post: &Post,
) -> Vec<AgentId> {
    config
        .reactor_ids()
        .into_iter()
        .filter(|&id| id != post.author_id)
        .filter(|&id| shared.autonomous_agent(id).is_some())
        .filter(|&id| shared.directory.acquaintances(id).contains(&post.author_id))
        .collect()
}
