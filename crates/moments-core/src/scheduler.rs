//! [`MomentsScheduler`]: wires the ledger, the Post Scheduler, both
//! watchers, and the Interaction Engine to the external collaborators.
//!
//! # Lifecycle
//!
//! 1. [`MomentsScheduler::new`] takes the collaborators and constants.
//!    Nothing runs yet.
//! 2. [`MomentsScheduler::start`] records the startup baseline in the
//!    dedup ledger, arms a posting timer for every eligible agent, and
//!    spawns two loops: one runs both watchers on every feed revision, the
//!    other re-arms posting timers on every config change.
//! 3. [`MomentsScheduler::shutdown`] (or drop) cancels every timer, every
//!    delayed reaction and reply, and both loops. A generation call that
//!    was already in flight may finish, but its result is discarded.
//!
//! Must be started from within a Tokio runtime.

use std::sync::{Arc, Mutex, PoisonError};

use moments_types::{AgentId, PostId, SchedulerConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::directory::Directory;
use crate::feed::FeedStore;
use crate::feed_watcher;
use crate::generation::GenerationClient;
use crate::interaction::{self, InteractionOutcome};
use crate::ledger::{DedupLedger, Seen};
use crate::post_scheduler::{self, PostStatus};
use crate::prompt::Prompts;
use crate::random::RandomSource;
use crate::reply_watcher;
use crate::settings::SchedulerParams;
use crate::shared::Shared;

/// The external collaborators the scheduler reads from and writes to.
pub struct Collaborators {
    /// The shared feed.
    pub feed: Arc<dyn FeedStore>,
    /// Agent lookup and acquaintances.
    pub directory: Arc<dyn Directory>,
    /// Text generation.
    pub generator: Arc<dyn GenerationClient>,
    /// Randomness for intervals, delays, and draws.
    pub random: Arc<dyn RandomSource>,
    /// Live configuration.
    pub config: watch::Receiver<SchedulerConfig>,
}

/// Work scheduled by one pass of both watchers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Delayed Interaction Engine invocations scheduled by the Feed Watcher.
    pub reactions: usize,
    /// Delayed replies scheduled by the Reply Watcher.
    pub replies: usize,
}

impl ScanReport {
    /// Whether nothing was scheduled.
    pub const fn is_empty(&self) -> bool {
        self.reactions == 0 && self.replies == 0
    }
}

/// The autonomous agent interaction scheduler.
pub struct MomentsScheduler {
    shared: Arc<Shared>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for MomentsScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MomentsScheduler")
            .field("running", &self.shared.is_running())
            .field("user_id", &self.shared.params.user_id)
            .finish_non_exhaustive()
    }
}

impl MomentsScheduler {
    /// Assemble a scheduler. Call [`start`](Self::start) to begin.
    pub fn new(collaborators: Collaborators, params: SchedulerParams, prompts: Prompts) -> Self {
        let Collaborators {
            feed,
            directory,
            generator,
            random,
            config,
        } = collaborators;
        Self {
            shared: Arc::new(Shared::new(
                feed, directory, generator, random, config, prompts, params,
            )),
            background: Mutex::new(Vec::new()),
        }
    }

    /// Start timers and watchers. Calling it while running does nothing.
    pub fn start(&self) {
        if !self.shared.begin() {
            return;
        }

        if self.shared.params.react_to_backlog {
            let report = self.scan();
            debug!(
                reactions = report.reactions,
                replies = report.replies,
                "backlog scanned"
            );
        } else {
            self.record_baseline();
        }

        let mut config_rx = self.shared.config.clone();
        let initial = config_rx.borrow_and_update().clone();
        for &agent_id in &initial.auto_post_agent_ids {
            if initial.posts_for(agent_id) {
                post_scheduler::reschedule(&self.shared, agent_id);
            }
        }

        let mut revisions = self.shared.feed.subscribe();
        let feed_shared = Arc::clone(&self.shared);
        let feed_loop = tokio::spawn(async move {
            while revisions.changed().await.is_ok() {
                let report = scan_once(&feed_shared);
                if !report.is_empty() {
                    debug!(
                        reactions = report.reactions,
                        replies = report.replies,
                        "feed change scheduled work"
                    );
                }
            }
        });
        let config_loop = tokio::spawn(post_scheduler::watch_config(
            Arc::clone(&self.shared),
            config_rx,
            initial,
        ));

        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([feed_loop, config_loop]);

        info!(
            user_id = %self.shared.params.user_id,
            react_to_backlog = self.shared.params.react_to_backlog,
            "moments scheduler started"
        );
    }

    /// Cancel everything. Safe to call more than once.
    pub fn shutdown(&self) {
        let was_running = self.shared.is_running();
        self.shared.halt();
        post_scheduler::cancel_all(&self.shared);
        self.shared.tasks.abort_all();
        for handle in self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            handle.abort();
        }
        if was_running {
            info!("moments scheduler stopped");
        }
    }

    /// Whether the scheduler is running.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Run both watchers once against the current feed.
    pub fn scan(&self) -> ScanReport {
        scan_once(&self.shared)
    }

    /// Run the Interaction Engine for one (agent, post) pair right away.
    pub async fn react(&self, agent_id: AgentId, post_id: PostId) -> InteractionOutcome {
        interaction::interact(&self.shared, agent_id, post_id).await
    }

    /// Cancel and, if still eligible, re-arm `agent_id`'s posting timer.
    pub fn reschedule(&self, agent_id: AgentId) {
        post_scheduler::reschedule(&self.shared, agent_id);
    }

    /// Posting state of `agent_id`, if it was ever considered for posting.
    pub fn post_status(&self, agent_id: AgentId) -> Option<PostStatus> {
        post_scheduler::status(&self.shared, agent_id)
    }

    /// The dedup ledger.
    pub fn ledger(&self) -> &DedupLedger {
        &self.shared.ledger
    }

    /// Delayed reactions and replies not yet reaped.
    pub fn pending_tasks(&self) -> usize {
        self.shared.tasks.len()
    }

    /// Mark everything currently in the feed as seen without reacting.
    fn record_baseline(&self) {
        let posts = self.shared.feed.snapshot();
        for post in &posts {
            self.shared.ledger.mark_seen(Seen::Post(post.id));
            for comment in &post.comments {
                self.shared.ledger.mark_seen(Seen::Comment(comment.id));
            }
        }
        debug!(posts = posts.len(), "startup baseline recorded");
    }
}

impl Drop for MomentsScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn scan_once(shared: &Arc<Shared>) -> ScanReport {
    ScanReport {
        reactions: feed_watcher::scan(shared),
        replies: reply_watcher::scan(shared),
    }
}
