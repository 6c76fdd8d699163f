//! Moments scheduler entry point.
//!
//! Loads the roster and scheduler settings, connects the generation backend,
//! and runs the scheduler against an in-memory feed until Ctrl-C. Agents
//! post, like, comment, and reply on their own; every action is logged.
//!
//! # Architecture
//!
//! ```text
//! moments.yaml --> roster + config --> MomentsScheduler --> InMemoryFeed
//!                                            |
//!                                            v
//!                               LLM backend (OpenAI / Anthropic)
//! ```
//!
//! Without `LLM_BACKEND` the runner still starts; every generation is then
//! skipped as not configured, while likes keep working. Send `SIGHUP` to
//! reload the `scheduler` section of the settings file.

mod config;
mod error;
mod llm;

use std::sync::Arc;

use anyhow::Context;
use moments_core::feed::{FeedStore, InMemoryFeed};
use moments_core::prompt::Prompts;
use moments_core::random::{RandomSource, SeededRandom, ThreadRandom};
use moments_core::settings::{ConfigStore, MomentsSettings};
use moments_core::{Collaborators, MomentsScheduler};
use moments_types::Post;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;
use crate::llm::create_backend;

/// Application entry point.
///
/// Initializes logging, loads configuration, starts the scheduler, and
/// waits for Ctrl-C before shutting it down.
///
/// # Errors
///
/// Returns an error if configuration, settings, templates, or the HTTP
/// client fail to load.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("moments-runner starting");

    let config = RunnerConfig::from_env()?;
    let settings = load_settings(&config)?;
    info!(
        settings = %config.settings_path.display(),
        agents = settings.agents.len(),
        acquaintances = settings.acquaintances.len(),
        react_to_backlog = settings.react_to_backlog,
        "settings loaded"
    );

    let prompts = match &settings.templates_dir {
        Some(dir) => Prompts::from_dir(dir)
            .with_context(|| format!("failed to load templates from {}", dir.display()))?,
        None => Prompts::builtin().context("failed to load built-in templates")?,
    };

    let backend = create_backend(config.backend.as_ref(), config.request_timeout)?;
    match &config.backend {
        Some(cfg) => info!(
            backend = backend.name(),
            api_url = cfg.api_url,
            model = cfg.model,
            "generation backend configured"
        ),
        None => warn!("LLM_BACKEND not set, posts, comments, and replies will be skipped"),
    }

    let random: Arc<dyn RandomSource> = match config.rng_seed {
        Some(seed) => {
            info!(seed, "using seeded random source");
            Arc::new(SeededRandom::new(seed))
        }
        None => Arc::new(ThreadRandom),
    };

    let feed = Arc::new(InMemoryFeed::default());
    let config_store = ConfigStore::new(settings.scheduler.clone());
    let scheduler = MomentsScheduler::new(
        Collaborators {
            feed: feed.clone(),
            directory: Arc::new(settings.directory()),
            generator: Arc::new(backend),
            random,
            config: config_store.subscribe(),
        },
        settings.params(),
        prompts,
    );
    scheduler.start();

    let activity = tokio::spawn(log_activity(feed));

    run_until_shutdown(&config, &config_store).await?;
    info!("shutdown requested");

    scheduler.shutdown();
    activity.abort();
    info!("moments-runner stopped");
    Ok(())
}

/// Read the settings file, falling back to defaults when it is absent.
fn load_settings(config: &RunnerConfig) -> anyhow::Result<MomentsSettings> {
    if !config.settings_path.exists() {
        warn!(
            settings = %config.settings_path.display(),
            "settings file not found, starting with an empty roster"
        );
        return Ok(MomentsSettings::default());
    }
    MomentsSettings::from_file(&config.settings_path)
        .with_context(|| format!("failed to load {}", config.settings_path.display()))
}

/// Wait for Ctrl-C, reloading the scheduler config on every SIGHUP.
#[cfg(unix)]
async fn run_until_shutdown(config: &RunnerConfig, store: &ConfigStore) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).context("failed to register SIGHUP handler")?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                return result.context("failed to listen for Ctrl-C");
            }
            _ = hangup.recv() => reload_config(config, store),
        }
    }
}

/// Wait for Ctrl-C.
#[cfg(not(unix))]
async fn run_until_shutdown(_config: &RunnerConfig, _store: &ConfigStore) -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")
}

/// Re-read the settings file and publish its `scheduler` section.
///
/// Only the live config is reloaded. Roster and parameter changes need a
/// restart.
#[cfg(unix)]
fn reload_config(config: &RunnerConfig, store: &ConfigStore) {
    match MomentsSettings::from_file(&config.settings_path) {
        Ok(settings) => {
            store.replace(settings.scheduler);
            info!(settings = %config.settings_path.display(), "scheduler config reloaded");
        }
        Err(e) => warn!(error = %e, "config reload failed, keeping current config"),
    }
}

/// Log a summary of the feed after every change.
async fn log_activity(feed: Arc<InMemoryFeed>) {
    let mut revisions = feed.subscribe();
    while revisions.changed().await.is_ok() {
        let revision = *revisions.borrow_and_update();
        let summary = FeedSummary::of(&feed.snapshot());
        debug!(
            revision,
            posts = summary.posts,
            likes = summary.likes,
            comments = summary.comments,
            "feed updated"
        );
    }
}

/// Totals across the feed.
#[derive(Debug, Default, PartialEq, Eq)]
struct FeedSummary {
    posts: usize,
    likes: usize,
    comments: usize,
}

impl FeedSummary {
    fn of(posts: &[Post]) -> Self {
        posts.iter().fold(
            Self {
                posts: posts.len(),
                ..Self::default()
            },
            |acc, post| Self {
                likes: acc.likes.saturating_add(post.likes.len()),
                comments: acc.comments.saturating_add(post.comments.len()),
                ..acc
            },
        )
    }
}
