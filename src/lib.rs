//! Commons Engine - Membership & reputation engine for the Commons
//! neighbor-assistance platform
//!
//! The engine owns the facts the rest of the platform only displays:
//! who belongs to a community, what role they hold, how trustworthy
//! they have proven to be, and what they have earned along the way.
//!
//! ## Services
//!
//! - **Permissions**: static role -> permission table consulted by every
//!   privileged operation
//! - **Roles**: admin/moderator assignment, bans, and the append-only
//!   admin action log
//! - **Membership**: join-request state machine (pending -> approved /
//!   rejected / cancelled) with transactional approval
//! - **Reputation**: seven-metric 0-100 trust score with per-metric
//!   breakdown and cached persistence
//! - **Gamification**: points, levels, achievements, and daily streaks
//!   driven by completion events
//! - **Scheduler**: event-triggered and daily batch trust-score recompute

pub mod auth;
pub mod config;
pub mod db;
pub mod gamification;
pub mod membership;
pub mod reputation;
pub mod scheduler;
pub mod types;

pub use config::{Args, ScoringConfig};
pub use types::{EngineError, Result};
