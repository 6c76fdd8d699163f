//! Process-wide scheduler configuration.
//!
//! [`SchedulerConfig`] is owned by the settings screen and persisted by
//! the host application. It may change at any moment; the scheduler reads
//! the latest snapshot on every decision and reacts to changes without a
//! restart. Field names serialize in `camelCase` to match the persisted
//! settings documents.
//!
//! Raw field values are stored as given. Consumers go through the
//! normalizing accessors ([`SchedulerConfig::post_interval`],
//! [`SchedulerConfig::like_chance`], ...) so a hand-edited settings file
//! with swapped bounds or an out-of-range probability still behaves.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::AgentId;

/// Default lower bound of the posting interval, in seconds.
const DEFAULT_POST_INTERVAL_MIN_SECS: u64 = 1800;

/// Default upper bound of the posting interval, in seconds.
const DEFAULT_POST_INTERVAL_MAX_SECS: u64 = 7200;

/// Default like probability.
const DEFAULT_LIKE_CHANCE: f64 = 0.5;

/// Default comment probability.
const DEFAULT_COMMENT_CHANCE: f64 = 0.3;

/// Autonomous posting, liking, and commenting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct SchedulerConfig {
    /// Master switch for autonomous posting.
    pub auto_post_enabled: bool,
    /// Agents that post on their own.
    pub auto_post_agent_ids: BTreeSet<AgentId>,
    /// Lower bound of the uniform posting interval, in seconds.
    pub post_interval_min: u64,
    /// Upper bound of the uniform posting interval, in seconds.
    pub post_interval_max: u64,
    /// Master switch for autonomous likes.
    pub auto_like_enabled: bool,
    /// Agents that like posts on their own.
    pub auto_like_agent_ids: BTreeSet<AgentId>,
    /// Probability in `[0, 1]` that an eligible agent likes a new post.
    pub like_chance: f64,
    /// Master switch for autonomous comments.
    pub auto_comment_enabled: bool,
    /// Agents that comment on their own.
    pub auto_comment_agent_ids: BTreeSet<AgentId>,
    /// Probability in `[0, 1]` that an eligible agent comments on a new post.
    pub comment_chance: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            auto_post_enabled: false,
            auto_post_agent_ids: BTreeSet::new(),
            post_interval_min: DEFAULT_POST_INTERVAL_MIN_SECS,
            post_interval_max: DEFAULT_POST_INTERVAL_MAX_SECS,
            auto_like_enabled: false,
            auto_like_agent_ids: BTreeSet::new(),
            like_chance: DEFAULT_LIKE_CHANCE,
            auto_comment_enabled: false,
            auto_comment_agent_ids: BTreeSet::new(),
            comment_chance: DEFAULT_COMMENT_CHANCE,
        }
    }
}

impl SchedulerConfig {
    /// Whether `agent_id` should have a posting timer armed.
    pub fn posts_for(&self, agent_id: AgentId) -> bool {
        self.auto_post_enabled && self.auto_post_agent_ids.contains(&agent_id)
    }

    /// Whether `agent_id` may like posts.
    pub fn likes_for(&self, agent_id: AgentId) -> bool {
        self.auto_like_enabled && self.auto_like_agent_ids.contains(&agent_id)
    }

    /// Whether `agent_id` may comment on posts.
    pub fn comments_for(&self, agent_id: AgentId) -> bool {
        self.auto_comment_enabled && self.auto_comment_agent_ids.contains(&agent_id)
    }

    /// Agents that may react (like or comment) to new posts, in id order.
    pub fn reactor_ids(&self) -> BTreeSet<AgentId> {
        let mut ids = BTreeSet::new();
        if self.auto_like_enabled {
            ids.extend(self.auto_like_agent_ids.iter().copied());
        }
        if self.auto_comment_enabled {
            ids.extend(self.auto_comment_agent_ids.iter().copied());
        }
        ids
    }

    /// Normalized posting interval bounds `(min, max)`.
    ///
    /// Bounds are ordered so `min <= max`, and a zero lower bound is raised
    /// to one second so a timer can never spin.
    pub fn post_interval(&self) -> (Duration, Duration) {
        let low = self.post_interval_min.min(self.post_interval_max).max(1);
        let high = self.post_interval_min.max(self.post_interval_max).max(low);
        (Duration::from_secs(low), Duration::from_secs(high))
    }

    /// Like probability clamped to `[0, 1]`.
    pub fn like_chance(&self) -> f64 {
        clamp_chance(self.like_chance)
    }

    /// Comment probability clamped to `[0, 1]`.
    pub fn comment_chance(&self) -> f64 {
        clamp_chance(self.comment_chance)
    }
}

/// Clamp a probability into `[0, 1]`, mapping NaN to zero.
pub fn clamp_chance(chance: f64) -> f64 {
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_all_disabled() {
        let config = SchedulerConfig::default();
        let agent = AgentId::new();
        assert!(!config.posts_for(agent));
        assert!(!config.likes_for(agent));
        assert!(!config.comments_for(agent));
        assert!(config.reactor_ids().is_empty());
    }

    #[test]
    fn membership_requires_master_switch() {
        let agent = AgentId::new();
        let mut config = SchedulerConfig::default();
        config.auto_like_agent_ids.insert(agent);
        assert!(!config.likes_for(agent));
        config.auto_like_enabled = true;
        assert!(config.likes_for(agent));
    }

    #[test]
    fn reactor_ids_union_enabled_sets_only() {
        let liker = AgentId::new();
        let commenter = AgentId::new();
        let mut config = SchedulerConfig {
            auto_like_enabled: true,
            ..SchedulerConfig::default()
        };
        config.auto_like_agent_ids.insert(liker);
        config.auto_comment_agent_ids.insert(commenter);

        let ids = config.reactor_ids();
        assert!(ids.contains(&liker));
        assert!(!ids.contains(&commenter));

        config.auto_comment_enabled = true;
        assert_eq!(config.reactor_ids().len(), 2);
    }

    #[test]
    fn post_interval_orders_swapped_bounds() {
        let config = SchedulerConfig {
            post_interval_min: 90,
            post_interval_max: 30,
            ..SchedulerConfig::default()
        };
        assert_eq!(
            config.post_interval(),
            (Duration::from_secs(30), Duration::from_secs(90))
        );
    }

    #[test]
    fn post_interval_never_zero() {
        let config = SchedulerConfig {
            post_interval_min: 0,
            post_interval_max: 0,
            ..SchedulerConfig::default()
        };
        let (min, max) = config.post_interval();
        assert_eq!(min, Duration::from_secs(1));
        assert_eq!(max, Duration::from_secs(1));
    }

    #[test]
    fn chances_are_clamped() {
        let config = SchedulerConfig {
            like_chance: 1.7,
            comment_chance: -0.2,
            ..SchedulerConfig::default()
        };
        assert!(config.like_chance() <= 1.0);
        assert!(config.comment_chance() >= 0.0);
        assert!(clamp_chance(f64::NAN) <= 0.0);
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let agent = AgentId::new();
        let json = serde_json::json!({
            "autoPostEnabled": true,
            "autoPostAgentIds": [agent],
            "postIntervalMin": 60
        });
        let config: SchedulerConfig = serde_json::from_value(json).unwrap_or_default();
        assert!(config.posts_for(agent));
        assert_eq!(config.post_interval_min, 60);
        assert_eq!(config.post_interval_max, DEFAULT_POST_INTERVAL_MAX_SECS);
    }
}
