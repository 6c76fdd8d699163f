//! Autonomous agent interaction scheduler for the Moments feed.
//!
//! Scripted personas post to a shared feed on randomized timers, react to
//! each other's posts with likes and comments, and answer the human user's
//! comments on their own posts. All text comes from an external generation
//! service behind [`GenerationClient`].
//!
//! # Modules
//!
//! - [`ledger`] -- Dedup ledger of processed post and comment ids.
//! - [`generation`] -- [`GenerationClient`] boundary and its errors.
//! - [`prompt`] -- Persona and instruction templates (`minijinja`).
//! - [`random`] -- Injectable [`RandomSource`] and draw helpers.
//! - [`feed`] -- [`FeedStore`] with its single update entry point.
//! - [`directory`] -- Agent lookup and acquaintances.
//! - [`settings`] -- Live [`ConfigStore`], process constants, settings file.
//! - [`post_scheduler`] -- Per-agent posting state machines.
//! - [`feed_watcher`] -- New posts to delayed reactions.
//! - [`interaction`] -- Like and comment decisions for one agent and post.
//! - [`reply_watcher`] -- Auto-replies to direct human comments.
//! - [`scheduler`] -- [`MomentsScheduler`], which runs all of the above.
//!
//! [`GenerationClient`]: generation::GenerationClient
//! [`RandomSource`]: random::RandomSource
//! [`FeedStore`]: feed::FeedStore
//! [`ConfigStore`]: settings::ConfigStore
//! [`MomentsScheduler`]: scheduler::MomentsScheduler

pub mod directory;
pub mod error;
pub mod feed;
pub mod feed_watcher;
pub mod generation;
pub mod interaction;
pub mod ledger;
pub mod post_scheduler;
pub mod prompt;
pub mod random;
pub mod reply_watcher;
pub mod scheduler;
pub mod settings;

mod shared;

pub use scheduler::{Collaborators, MomentsScheduler, ScanReport};
