//! Gamification
//!
//! Points, levels, achievements, and daily streaks driven by
//! completion and rating events. Counters are monotonic; the
//! achievement set only grows.

pub mod achievements;
pub mod engine;
pub mod levels;

pub use achievements::{newly_unlocked, AchievementDef, Requirement, UserStats};
pub use engine::{CompletionAward, GamificationEngine, UserReputation};
pub use levels::calculate_level;
