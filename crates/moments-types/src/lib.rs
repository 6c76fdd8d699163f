//! Shared type definitions for Moments.
//!
//! This crate is the single source of truth for the feed data model and
//! the scheduler configuration. Types defined here flow downstream to
//! `TypeScript` via `ts-rs` for the feed UI.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents, posts, and comments
//! - [`feed`] -- Agents, posts, and comments
//! - [`config`] -- The process-wide [`SchedulerConfig`]

pub mod config;
pub mod feed;
pub mod ids;

pub use config::SchedulerConfig;
pub use feed::{Agent, Comment, Post};
pub use ids::{AgentId, CommentId, PostId};
