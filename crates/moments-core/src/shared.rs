//! State shared by the scheduler components and their spawned tasks.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use moments_types::{Agent, AgentId, SchedulerConfig};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::warn;

use crate::directory::Directory;
use crate::error::SchedulerError;
use crate::feed::FeedStore;
use crate::generation::{GenerationClient, GenerationRequest};
use crate::ledger::DedupLedger;
use crate::post_scheduler::PostSlot;
use crate::prompt::Prompts;
use crate::random::RandomSource;
use crate::settings::SchedulerParams;

/// Everything a component needs, owned once per scheduler instance.
pub(crate) struct Shared {
    pub(crate) feed: Arc<dyn FeedStore>,
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) generator: Arc<dyn GenerationClient>,
    pub(crate) random: Arc<dyn RandomSource>,
    pub(crate) config: watch::Receiver<SchedulerConfig>,
    pub(crate) prompts: Prompts,
    pub(crate) params: SchedulerParams,
    pub(crate) ledger: DedupLedger,
    /// Per-agent posting state machines, keyed by agent.
    pub(crate) timers: Mutex<BTreeMap<AgentId, PostSlot>>,
    /// Delayed reactions and replies.
    pub(crate) tasks: TaskTracker,
    running: AtomicBool,
}

impl Shared {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        feed: Arc<dyn FeedStore>,
        directory: Arc<dyn Directory>,
        generator: Arc<dyn GenerationClient>,
        random: Arc<dyn RandomSource>,
        config: watch::Receiver<SchedulerConfig>,
        prompts: Prompts,
        params: SchedulerParams,
    ) -> Self {
        Self {
            feed,
            directory,
            generator,
            random,
            config,
            prompts,
            params,
            ledger: DedupLedger::new(),
            timers: Mutex::new(BTreeMap::new()),
            tasks: TaskTracker::default(),
            running: AtomicBool::new(false),
        }
    }

    /// The latest configuration. Never cached across a decision.
    pub(crate) fn config(&self) -> SchedulerConfig {
        self.config.borrow().clone()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flip to running. Returns `false` if already running.
    pub(crate) fn begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn halt(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn lock_timers(&self) -> MutexGuard<'_, BTreeMap<AgentId, PostSlot>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// An autonomous agent the scheduler may act for.
    pub(crate) fn autonomous_agent(&self, agent_id: AgentId) -> Option<Agent> {
        if agent_id == self.params.user_id {
            return None;
        }
        self.directory.agent(agent_id).filter(|a| !a.is_human)
    }

    /// Display name for prompts, falling back for unknown authors.
    pub(crate) fn display_name(&self, agent_id: AgentId) -> String {
        self.directory
            .agent(agent_id)
            .map_or_else(|| "Someone".to_owned(), |a| a.name)
    }

    /// Persona plus instruction for `agent`, or `None` after logging a
    /// template failure.
    pub(crate) fn build_request(
        &self,
        agent: &Agent,
        action: &'static str,
        instruction: impl FnOnce(&Prompts) -> Result<String, SchedulerError>,
    ) -> Option<GenerationRequest> {
        let built = self.prompts.persona(agent).and_then(|persona| {
            Ok(GenerationRequest {
                persona,
                instruction: instruction(&self.prompts)?,
            })
        });
        match built {
            Ok(request) => Some(request),
            Err(e) => {
                warn!(agent_id = %agent.id, action, error = %e, "prompt rendering failed, skipping");
                None
            }
        }
    }
}

/// Owns the one-shot reaction and reply tasks so shutdown can cancel them.
#[derive(Default)]
pub(crate) struct TaskTracker {
    set: Mutex<JoinSet<()>>,
}

impl TaskTracker {
    /// Spawn `task`, reaping any tasks that already finished.
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        while set.try_join_next().is_some() {}
        set.spawn(task);
    }

    /// Number of tasks not yet reaped.
    pub(crate) fn len(&self) -> usize {
        self.set.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn abort_all(&self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}
