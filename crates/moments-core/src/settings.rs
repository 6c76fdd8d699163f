//! Scheduler settings: the live config store, process constants, and the
//! YAML settings file.
//!
//! Three layers, from most to least dynamic:
//!
//! - [`ConfigStore`] holds the live [`SchedulerConfig`]. It may change at
//!   any time; the scheduler re-reads it on every decision and re-arms only
//!   the posting timers a change affects.
//! - [`SchedulerParams`] are process constants: the canonical human user
//!   id, the fixed auto-reply probability, the startup baseline switch,
//!   and the [`ReactionTiming`] windows.
//! - [`MomentsSettings`] mirrors `moments.yaml` and produces both of the
//!   above plus the initial agent roster.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use moments_types::{Agent, AgentId, SchedulerConfig};
use serde::Deserialize;
use tokio::sync::watch;

use crate::directory::InMemoryDirectory;
use crate::random::{RandomSource, uniform_duration};

/// Default probability that an agent auto-replies to a direct human comment.
pub const DEFAULT_REPLY_CHANCE: f64 = 0.8;

/// Errors that can occur when loading the settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse settings YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for SettingsError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

// ---------------------------------------------------------------------------
// Live configuration
// ---------------------------------------------------------------------------

/// Shared, observable holder of the current [`SchedulerConfig`].
///
/// Cloning yields another handle to the same store.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    tx: Arc<watch::Sender<SchedulerConfig>>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl ConfigStore {
    /// Create a store holding `config`.
    pub fn new(config: SchedulerConfig) -> Self {
        let (tx, _) = watch::channel(config);
        Self { tx: Arc::new(tx) }
    }

    /// A copy of the current configuration.
    pub fn snapshot(&self) -> SchedulerConfig {
        self.tx.borrow().clone()
    }

    /// Replace the configuration and notify subscribers.
    pub fn replace(&self, config: SchedulerConfig) {
        self.tx.send_replace(config);
    }

    /// Edit the configuration in place and notify subscribers.
    pub fn update(&self, edit: impl FnOnce(&mut SchedulerConfig)) {
        self.tx.send_modify(edit);
    }

    /// A receiver that observes every change.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerConfig> {
        self.tx.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Process constants
// ---------------------------------------------------------------------------

/// Delay windows for reactions and replies, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionTiming {
    /// Lower bound of the base delay before a reactor evaluates a new post.
    #[serde(default = "default_reaction_delay_min_ms")]
    pub reaction_delay_min_ms: u64,

    /// Upper bound of the base reaction delay.
    #[serde(default = "default_reaction_delay_max_ms")]
    pub reaction_delay_max_ms: u64,

    /// Extra delay per position in the eligible-reactor list.
    #[serde(default = "default_reaction_stagger_ms")]
    pub reaction_stagger_ms: u64,

    /// Lower bound of the pause between a like and the follow-up comment.
    #[serde(default = "default_follow_up_min_ms")]
    pub follow_up_min_ms: u64,

    /// Upper bound of the like-to-comment pause.
    #[serde(default = "default_follow_up_max_ms")]
    pub follow_up_max_ms: u64,

    /// Lower bound of the delay before an auto-reply is generated.
    #[serde(default = "default_reply_delay_min_ms")]
    pub reply_delay_min_ms: u64,

    /// Upper bound of the auto-reply delay.
    #[serde(default = "default_reply_delay_max_ms")]
    pub reply_delay_max_ms: u64,
}

impl Default for ReactionTiming {
    fn default() -> Self {
        Self {
            reaction_delay_min_ms: default_reaction_delay_min_ms(),
            reaction_delay_max_ms: default_reaction_delay_max_ms(),
            reaction_stagger_ms: default_reaction_stagger_ms(),
            follow_up_min_ms: default_follow_up_min_ms(),
            follow_up_max_ms: default_follow_up_max_ms(),
            reply_delay_min_ms: default_reply_delay_min_ms(),
            reply_delay_max_ms: default_reply_delay_max_ms(),
        }
    }
}

impl ReactionTiming {
    /// Delay before the reactor at `index` evaluates a new post.
    ///
    /// A random base from the reaction window plus `index` staggers. The
    /// window is wider than one stagger step, so consecutive reactors
    /// overlap and their order is not fixed.
    pub fn reaction_delay(&self, random: &dyn RandomSource, index: usize) -> Duration {
        let base = uniform_duration(
            random,
            Duration::from_millis(self.reaction_delay_min_ms),
            Duration::from_millis(self.reaction_delay_max_ms),
        );
        let steps = u64::try_from(index).unwrap_or(u64::MAX);
        base.saturating_add(Duration::from_millis(
            self.reaction_stagger_ms.saturating_mul(steps),
        ))
    }

    /// Pause between a like and the follow-up comment of the same reactor.
    pub fn follow_up_delay(&self, random: &dyn RandomSource) -> Duration {
        uniform_duration(
            random,
            Duration::from_millis(self.follow_up_min_ms),
            Duration::from_millis(self.follow_up_max_ms),
        )
    }

    /// Delay before an auto-reply is generated.
    pub fn reply_delay(&self, random: &dyn RandomSource) -> Duration {
        uniform_duration(
            random,
            Duration::from_millis(self.reply_delay_min_ms),
            Duration::from_millis(self.reply_delay_max_ms),
        )
    }
}

/// Process-constant scheduler parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerParams {
    /// The canonical human user. Never driven by the scheduler; the only
    /// author whose direct comments trigger auto-replies.
    pub user_id: AgentId,
    /// Fixed probability of auto-replying to a direct human comment.
    pub reply_chance: f64,
    /// When `false`, posts and comments already in the feed at start-up
    /// are recorded as seen without reacting.
    pub react_to_backlog: bool,
    /// Delay windows.
    pub timing: ReactionTiming,
}

impl SchedulerParams {
    /// Default parameters for `user_id`.
    pub fn new(user_id: AgentId) -> Self {
        Self {
            user_id,
            reply_chance: DEFAULT_REPLY_CHANCE,
            react_to_backlog: false,
            timing: ReactionTiming::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings file
// ---------------------------------------------------------------------------

/// The human user's identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserSettings {
    /// Canonical user id.
    #[serde(default)]
    pub id: AgentId,
    /// Display name.
    #[serde(default = "default_user_name")]
    pub name: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            id: AgentId::new(),
            name: default_user_name(),
        }
    }
}

/// Top-level settings, mirroring `moments.yaml`.
///
/// Every field has a default, so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MomentsSettings {
    /// The human user.
    #[serde(default)]
    pub user: UserSettings,

    /// Autonomous agents.
    #[serde(default)]
    pub agents: Vec<Agent>,

    /// Acquaintance pairs (symmetric).
    #[serde(default)]
    pub acquaintances: Vec<(AgentId, AgentId)>,

    /// Initial scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Auto-reply probability.
    #[serde(default = "default_reply_chance")]
    pub reply_chance: f64,

    /// React to posts already present at start-up.
    #[serde(default)]
    pub react_to_backlog: bool,

    /// Delay windows.
    #[serde(default)]
    pub timing: ReactionTiming,

    /// Optional directory of prompt template overrides.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

impl Default for MomentsSettings {
    fn default() -> Self {
        Self {
            user: UserSettings::default(),
            agents: Vec::new(),
            acquaintances: Vec::new(),
            scheduler: SchedulerConfig::default(),
            reply_chance: DEFAULT_REPLY_CHANCE,
            react_to_backlog: false,
            timing: ReactionTiming::default(),
            templates_dir: None,
        }
    }
}

impl MomentsSettings {
    /// Load settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be read, or
    /// [`SettingsError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, SettingsError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Scheduler parameters derived from these settings.
    pub fn params(&self) -> SchedulerParams {
        SchedulerParams {
            user_id: self.user.id,
            reply_chance: self.reply_chance,
            react_to_backlog: self.react_to_backlog,
            timing: self.timing.clone(),
        }
    }

    /// A directory holding the user, every agent, and every acquaintance.
    pub fn directory(&self) -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        directory.upsert_agent(Agent::human(self.user.id, self.user.name.clone()));
        for agent in &self.agents {
            directory.upsert_agent(agent.clone());
        }
        for &(a, b) in &self.acquaintances {
            directory.acquaint(a, b);
        }
        directory
    }
}

const fn default_reaction_delay_min_ms() -> u64 {
    5_000
}

const fn default_reaction_delay_max_ms() -> u64 {
    15_000
}

const fn default_reaction_stagger_ms() -> u64 {
    3_000
}

const fn default_follow_up_min_ms() -> u64 {
    2_000
}

const fn default_follow_up_max_ms() -> u64 {
    8_000
}

const fn default_reply_delay_min_ms() -> u64 {
    5_000
}

const fn default_reply_delay_max_ms() -> u64 {
    20_000
}

const fn default_reply_chance() -> f64 {
    DEFAULT_REPLY_CHANCE
}

fn default_user_name() -> String {
    "Me".to_owned()
}

#[cfg(test)]
mod tests {
    use moments_types::PostId;

    use super::*;
    use crate::directory::Directory;
    use crate::random::SequenceRandom;

    #[test]
    fn reaction_delay_adds_stagger_per_index() {
        let timing = ReactionTiming::default();
        let random = SequenceRandom::constant(0.0);
        assert_eq!(timing.reaction_delay(&random, 0), Duration::from_secs(5));
        assert_eq!(timing.reaction_delay(&random, 2), Duration::from_secs(11));
    }

    #[test]
    fn adjacent_reactors_overlap() {
        let timing = ReactionTiming::default();
        let late_first = timing.reaction_delay(&SequenceRandom::constant(0.9), 0);
        let early_second = timing.reaction_delay(&SequenceRandom::constant(0.0), 1);
        assert!(early_second < late_first);
    }

    #[test]
    fn config_store_notifies_on_update() {
        let store = ConfigStore::default();
        let mut rx = store.subscribe();
        let agent = AgentId::new();
        store.update(|c| {
            c.auto_post_enabled = true;
            c.auto_post_agent_ids.insert(agent);
        });
        assert!(rx.has_changed().unwrap_or(false));
        assert!(rx.borrow_and_update().posts_for(agent));
        assert!(store.snapshot().posts_for(agent));
    }

    #[test]
    fn parse_full_yaml() {
        let user = AgentId::new();
        let mia = AgentId::new();
        let ken = AgentId::new();
        let yaml = format!(
            r#"
user:
  id: "{user}"
  name: "Alex"
agents:
  - id: "{mia}"
    name: "Mia"
    personality: "film photography"
  - id: "{ken}"
    name: "Ken"
acquaintances:
  - ["{mia}", "{ken}"]
  - ["{mia}", "{user}"]
scheduler:
  autoPostEnabled: true
  autoPostAgentIds: ["{mia}"]
  postIntervalMin: 60
  postIntervalMax: 120
  autoLikeEnabled: true
  autoLikeAgentIds: ["{ken}"]
  likeChance: 0.9
reply_chance: 0.5
timing:
  reaction_delay_min_ms: 1000
"#
        );

        let settings = MomentsSettings::parse(&yaml);
        assert!(settings.is_ok(), "{settings:?}");
        let settings = settings.unwrap_or_default();

        assert_eq!(settings.user.name, "Alex");
        assert_eq!(settings.agents.len(), 2);
        assert!(settings.scheduler.posts_for(mia));
        assert!(settings.scheduler.likes_for(ken));
        assert_eq!(settings.timing.reaction_delay_min_ms, 1000);
        assert_eq!(settings.timing.reaction_delay_max_ms, 15_000);

        let params = settings.params();
        assert_eq!(params.user_id, user);
        assert!((params.reply_chance - 0.5).abs() < f64::EPSILON);
        assert!(!params.react_to_backlog);

        let directory = settings.directory();
        assert!(directory.agent(user).is_some_and(|a| a.is_human));
        assert!(directory.acquaintances(mia).contains(&ken));
        assert!(directory.acquaintances(user).contains(&mia));
        assert!(directory.agent(AgentId::from(PostId::new().into_inner())).is_none());
    }

    #[test]
    fn parse_minimal_yaml() {
        let settings = MomentsSettings::parse("react_to_backlog: true\n");
        assert!(settings.is_ok());
        let settings = settings.unwrap_or_default();
        assert!(settings.react_to_backlog);
        assert!(settings.agents.is_empty());
        assert!((settings.reply_chance - DEFAULT_REPLY_CHANCE).abs() < f64::EPSILON);
        assert_eq!(settings.timing, ReactionTiming::default());
    }

    #[test]
    fn bundled_settings_file_parses() {
        let settings = MomentsSettings::parse(include_str!("../../../moments.yaml"));
        assert!(settings.is_ok(), "{settings:?}");
        let settings = settings.unwrap_or_default();
        assert_eq!(settings.agents.len(), 3);
        assert_eq!(settings.directory().len(), 4);
        assert!(settings.scheduler.auto_post_enabled);
        assert_eq!(settings.scheduler.auto_like_agent_ids.len(), 2);
        assert_eq!(settings.timing.follow_up_min_ms, 2_000);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = MomentsSettings::from_file(Path::new("/nonexistent/moments.yaml"));
        assert!(matches!(result, Err(SettingsError::Io { .. })));
    }
}
