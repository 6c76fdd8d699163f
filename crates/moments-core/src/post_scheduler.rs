//! Post Scheduler: one posting state machine per agent.
//!
//! ```text
//!            enabled & listed                 timer fires
//!   Idle ---------------------> Waiting ---------------------> Posting
//!    ^                            |  ^                            |
//!    |   disabled / delisted      |  |   re-arm (fresh interval)  |
//!    +----------------------------+  +----------------------------+
//! ```
//!
//! [`reschedule`] is the only place a timer is created or cancelled. It
//! bumps the slot's epoch, so a timer or posting cycle from an older epoch
//! can always tell it has been superseded and leaves the slot alone.
//!
//! Each cycle draws a fresh interval between `postIntervalMin` and
//! `postIntervalMax`. The first arming of an agent adds a random offset in
//! `[0, postIntervalMin]` so agents enabled together do not post in
//! lockstep. A config change re-arms only the agents whose eligibility or
//! interval bounds actually changed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moments_types::{AgentId, Post, SchedulerConfig};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::feed;
use crate::generation::generate_text;
use crate::random::uniform_duration;
use crate::shared::Shared;

/// Posting state of one agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostState {
    /// No timer armed.
    #[default]
    Idle,
    /// A timer is armed.
    Waiting,
    /// A generation call is in flight.
    Posting,
}

/// Observable snapshot of an agent's posting state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostStatus {
    /// Current state.
    pub state: PostState,
    /// Delay of the most recently armed timer, while one is armed.
    pub armed_delay: Option<Duration>,
    /// When the timer last fired.
    pub last_fired_at: Option<DateTime<Utc>>,
    /// When a post was last added to the feed.
    pub last_posted_at: Option<DateTime<Utc>>,
    /// Completed posting cycles, successful or not.
    pub cycles: u64,
}

/// Table entry for one agent.
#[derive(Debug, Default)]
pub(crate) struct PostSlot {
    state: PostState,
    timer: Option<AbortHandle>,
    epoch: u64,
    armed_once: bool,
    armed_delay: Option<Duration>,
    last_fired_at: Option<DateTime<Utc>>,
    last_posted_at: Option<DateTime<Utc>>,
    cycles: u64,
}

impl PostSlot {
    fn status(&self) -> PostStatus {
        PostStatus {
            state: self.state,
            armed_delay: self.armed_delay,
            last_fired_at: self.last_fired_at,
            last_posted_at: self.last_posted_at,
            cycles: self.cycles,
        }
    }

    /// Cancel any timer and invalidate in-flight cycles.
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.epoch = self.epoch.wrapping_add(1);
        self.armed_delay = None;
    }
}

/// Cancel and, if the agent is still eligible, re-arm its posting timer.
pub(crate) fn reschedule(shared: &Arc<Shared>, agent_id: AgentId) {
    let config = shared.config();
    let eligible = shared.is_running()
        && config.posts_for(agent_id)
        && shared.autonomous_agent(agent_id).is_some();

    let mut timers = shared.lock_timers();
    let slot = timers.entry(agent_id).or_default();
    slot.disarm();

    if !eligible {
        if slot.state != PostState::Idle {
            debug!(agent_id = %agent_id, "posting timer cancelled");
        }
        slot.state = PostState::Idle;
        return;
    }

    let (min, max) = config.post_interval();
    let mut delay = uniform_duration(&*shared.random, min, max);
    if !slot.armed_once {
        delay = delay.saturating_add(uniform_duration(&*shared.random, Duration::ZERO, min));
        slot.armed_once = true;
    }

    let epoch = slot.epoch;
    let task_shared = Arc::clone(shared);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        fire(task_shared, agent_id, epoch).await;
    });

    slot.timer = Some(handle.abort_handle());
    slot.state = PostState::Waiting;
    slot.armed_delay = Some(delay);
    debug!(
        agent_id = %agent_id,
        delay_secs = delay.as_secs(),
        "posting timer armed"
    );
}

/// Cancel every timer. In-flight posting cycles finish but do not re-arm.
pub(crate) fn cancel_all(shared: &Shared) {
    let mut timers = shared.lock_timers();
    for slot in timers.values_mut() {
        slot.disarm();
        slot.state = PostState::Idle;
    }
}

/// Snapshot of one agent's state machine.
pub(crate) fn status(shared: &Shared, agent_id: AgentId) -> Option<PostStatus> {
    shared.lock_timers().get(&agent_id).map(PostSlot::status)
}

/// Re-arm agents affected by each config change until the channel closes.
///
/// `previous` must be the value the initial arming was based on.
pub(crate) async fn watch_config(
    shared: Arc<Shared>,
    mut config_rx: watch::Receiver<SchedulerConfig>,
    mut previous: SchedulerConfig,
) {
    while config_rx.changed().await.is_ok() {
        let current = config_rx.borrow_and_update().clone();
        let affected = affected_agents(&previous, &current);
        if !affected.is_empty() {
            debug!(agents = affected.len(), "config changed, rescheduling posting timers");
        }
        for agent_id in affected {
            reschedule(&shared, agent_id);
        }
        previous = current;
    }
}

/// Agents whose eligibility or interval bounds differ between two configs.
pub(crate) fn affected_agents(previous: &SchedulerConfig, current: &SchedulerConfig) -> Vec<AgentId> {
    let bounds_changed = previous.post_interval() != current.post_interval();
    previous
        .auto_post_agent_ids
        .union(&current.auto_post_agent_ids)
        .copied()
        .filter(|&id| {
            let was = previous.posts_for(id);
            let now = current.posts_for(id);
            was != now || (now && bounds_changed)
        })
        .collect()
}

/// Timer callback: run one posting cycle, then re-arm if still current.
async fn fire(shared: Arc<Shared>, agent_id: AgentId, epoch: u64) {
    {
        let mut timers = shared.lock_timers();
        let Some(slot) = timers.get_mut(&agent_id) else {
            return;
        };
        if slot.epoch != epoch {
            return;
        }
        slot.state = PostState::Posting;
        slot.timer = None;
        slot.armed_delay = None;
        slot.last_fired_at = Some(Utc::now());
    }

    let posted = post_once(&shared, agent_id).await;

    let still_current = {
        let mut timers = shared.lock_timers();
        timers.get_mut(&agent_id).is_some_and(|slot| {
            if posted {
                slot.last_posted_at = Some(Utc::now());
            }
            slot.cycles = slot.cycles.saturating_add(1);
            slot.epoch == epoch
        })
    };

    if still_current {
        reschedule(&shared, agent_id);
    }
}

/// Generate and publish one post. Returns `true` if a post was added.
async fn post_once(shared: &Shared, agent_id: AgentId) -> bool {
    let Some(agent) = shared.autonomous_agent(agent_id) else {
        debug!(agent_id = %agent_id, "not an autonomous agent, skipping post");
        return false;
    };
    let Some(request) = shared.build_request(&agent, "post", |p| p.post()) else {
        return false;
    };
    let Some(text) = generate_text(&*shared.generator, request, agent_id, "post").await else {
        return false;
    };

    if !shared.is_running() || !shared.config().posts_for(agent_id) {
        debug!(agent_id = %agent_id, "posting disabled while generating, discarding post");
        return false;
    }

    let post = Post::new(agent_id, text);
    let post_id = post.id;
    shared
        .feed
        .update(&mut |posts| Some(feed::prepend(posts, post.clone())));
    info!(agent_id = %agent_id, agent = agent.name, post_id = %post_id, "agent published post");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(agent: AgentId, min: u64, max: u64) -> SchedulerConfig {
        let mut config = SchedulerConfig {
            auto_post_enabled: true,
            post_interval_min: min,
            post_interval_max: max,
            ..SchedulerConfig::default()
        };
        config.auto_post_agent_ids.insert(agent);
        config
    }

    #[test]
    fn unchanged_config_affects_nobody() {
        let agent = AgentId::new();
        let config = config_with(agent, 60, 120);
        assert!(affected_agents(&config, &config).is_empty());
    }

    #[test]
    fn bounds_change_affects_enabled_agents_only() {
        let enabled = AgentId::new();
        let listed_elsewhere = AgentId::new();
        let previous = config_with(enabled, 60, 60);
        let mut current = config_with(enabled, 5, 5);
        current.auto_like_agent_ids.insert(listed_elsewhere);

        assert_eq!(affected_agents(&previous, &current), vec![enabled]);
    }

    #[test]
    fn enabling_and_delisting_are_detected() {
        let a = AgentId::new();
        let b = AgentId::new();
        let previous = config_with(a, 60, 60);
        let mut current = config_with(b, 60, 60);
        current.auto_post_agent_ids.remove(&a);

        let affected = affected_agents(&previous, &current);
        assert!(affected.contains(&a));
        assert!(affected.contains(&b));
    }

    #[test]
    fn master_switch_affects_everyone_listed() {
        let a = AgentId::new();
        let previous = config_with(a, 60, 60);
        let current = SchedulerConfig {
            auto_post_enabled: false,
            ..previous.clone()
        };
        assert_eq!(affected_agents(&previous, &current), vec![a]);
    }

    #[test]
    fn disarm_invalidates_epoch() {
        let mut slot = PostSlot {
            armed_delay: Some(Duration::from_secs(3)),
            ..PostSlot::default()
        };
        let before = slot.epoch;
        slot.disarm();
        assert_ne!(slot.epoch, before);
        assert!(slot.armed_delay.is_none());
        assert!(slot.timer.is_none());
    }
}
