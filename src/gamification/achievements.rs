//! Achievement catalog and evaluation
//!
//! Each achievement is a data entry: an ID, a point bonus, and a
//! declarative requirement over a stats snapshot. Adding one means
//! adding a row, not new control flow. Evaluation is idempotent and
//! re-entrant: held achievements are skipped by set membership before
//! their predicate even runs, so re-evaluating an unchanged profile
//! changes nothing and inconsistent later data can never regress an
//! unlock.

use std::collections::{BTreeSet, HashMap};

/// Snapshot of the aggregate stats requirements are evaluated against
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    pub requests_completed: i64,
    pub rating_avg: f64,
    pub rating_count: i64,
    pub streak_days: i32,
    pub fast_completions: i64,
    pub early_claims: i64,
    pub points: i64,
    /// Completions per request category
    pub category_stats: HashMap<String, i64>,
}

/// Declarative predicate over a [`UserStats`] snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    RequestsCompleted(i64),
    AverageRating { min: f64, min_count: i64 },
    StreakDays(i32),
    CategoryCount { category: &'static str, count: i64 },
    FastCompletions(i64),
    EarlyClaims(i64),
    PointsTotal(i64),
}

impl Requirement {
    /// Whether the snapshot satisfies this requirement
    pub fn is_met(&self, stats: &UserStats) -> bool {
        match self {
            Self::RequestsCompleted(n) => stats.requests_completed >= *n,
            Self::AverageRating { min, min_count } => {
                stats.rating_count >= *min_count && stats.rating_avg >= *min
            }
            Self::StreakDays(n) => stats.streak_days >= *n,
            Self::CategoryCount { category, count } => {
                stats.category_stats.get(*category).copied().unwrap_or(0) >= *count
            }
            Self::FastCompletions(n) => stats.fast_completions >= *n,
            Self::EarlyClaims(n) => stats.early_claims >= *n,
            Self::PointsTotal(n) => stats.points >= *n,
        }
    }

}

/// One achievement: immutable configuration, not user data
#[derive(Debug, Clone)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub points_awarded: i64,
    pub requirement: Requirement,
}

/// The static achievement catalog
pub fn catalog() -> &'static [AchievementDef] {
    static CATALOG: &[AchievementDef] = &[
        AchievementDef {
            id: "first_help",
            name: "First Help",
            points_awarded: 10,
            requirement: Requirement::RequestsCompleted(1),
        },
        AchievementDef {
            id: "helping_hand",
            name: "Helping Hand",
            points_awarded: 20,
            requirement: Requirement::RequestsCompleted(5),
        },
        AchievementDef {
            id: "super_helper",
            name: "Super Helper",
            points_awarded: 50,
            requirement: Requirement::RequestsCompleted(25),
        },
        AchievementDef {
            id: "community_pillar",
            name: "Community Pillar",
            points_awarded: 100,
            requirement: Requirement::RequestsCompleted(100),
        },
        AchievementDef {
            id: "five_star",
            name: "Five Star Neighbor",
            points_awarded: 50,
            requirement: Requirement::AverageRating {
                min: 4.8,
                min_count: 10,
            },
        },
        AchievementDef {
            id: "week_streak",
            name: "Week Streak",
            points_awarded: 25,
            requirement: Requirement::StreakDays(7),
        },
        AchievementDef {
            id: "month_streak",
            name: "Month Streak",
            points_awarded: 100,
            requirement: Requirement::StreakDays(30),
        },
        AchievementDef {
            id: "speedy",
            name: "Speedy",
            points_awarded: 30,
            requirement: Requirement::FastCompletions(10),
        },
        AchievementDef {
            id: "first_responder",
            name: "First Responder",
            points_awarded: 30,
            requirement: Requirement::EarlyClaims(10),
        },
        AchievementDef {
            id: "grocery_hero",
            name: "Grocery Hero",
            points_awarded: 25,
            requirement: Requirement::CategoryCount {
                category: "groceries",
                count: 10,
            },
        },
    ];
    CATALOG
}

/// Achievements newly satisfied and not already held. Membership is
/// checked before the predicate so held achievements are never
/// re-evaluated, let alone re-awarded.
pub fn newly_unlocked<'a>(
    stats: &UserStats,
    held: &BTreeSet<String>,
    defs: &'a [AchievementDef],
) -> Vec<&'a AchievementDef> {
    defs.iter()
        .filter(|def| !held.contains(def.id))
        .filter(|def| def.requirement.is_met(stats))
        .collect()
}
