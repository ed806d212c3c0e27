//! Point awards, streaks, and achievement unlocks
//!
//! The base award (points, completion count, category stat, streak)
//! commits first; achievement bonuses commit in a second write. A
//! failure during the bonus pass is logged and swallowed so the
//! non-gamification side effects of completing a request are never
//! lost to a gamification hiccup.

use bson::{doc, DateTime};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ScoringConfig;
use crate::db::schemas::{HelpRequestDoc, Urgency, UserDoc};
use crate::db::MongoCollection;
use crate::gamification::achievements::{catalog, newly_unlocked, UserStats};
use crate::gamification::levels::{calculate_level, level_index};
use crate::types::{EngineError, Result};

/// Outcome of a completion award; drives user-facing notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionAward {
    /// Total points credited, achievement bonuses included
    pub points_awarded: i64,
    /// Achievement IDs unlocked by this event
    pub unlocked: Vec<String>,
    /// Whether the total crossed a level threshold
    pub leveled_up: bool,
    /// Level name after the award
    pub new_level: String,
}

/// Points for one completion, before achievement bonuses
pub fn completion_points(cfg: &ScoringConfig, urgency: Urgency, completion_duration_ms: i64) -> i64 {
    let mut points = cfg.base_points;
    points += match urgency {
        Urgency::High => cfg.high_urgency_bonus,
        Urgency::Medium => cfg.medium_urgency_bonus,
        Urgency::Low => 0,
    };
    if completion_duration_ms <= cfg.fast_completion_window_hours * 3_600_000 {
        points += cfg.fast_completion_bonus;
    }
    points
}

/// Advance the daily streak for a completion on `today`: yesterday
/// extends it, today leaves it unchanged, anything else resets to 1.
pub fn advance_streak(last_activity: Option<NaiveDate>, today: NaiveDate, current: i32) -> i32 {
    match last_activity {
        Some(last) if last == today => current.max(1),
        Some(last) if last + Duration::days(1) == today => current + 1,
        _ => 1,
    }
}

/// Running average with one more sample folded in
pub fn next_rating_avg(old_avg: f64, old_count: i64, new_rating: f64) -> f64 {
    (old_avg * old_count as f64 + new_rating) / (old_count + 1) as f64
}

/// Filter that matches the user only while they do not yet hold the
/// achievement, making the paired `$inc` single-shot under races
pub fn achievement_award_filter(user_id: &str, achievement_id: &str) -> bson::Document {
    doc! { "user_id": user_id, "achievements": { "$ne": achievement_id } }
}

/// The unlock write paired with [`achievement_award_filter`]
pub fn achievement_award_update(def: &crate::gamification::AchievementDef) -> bson::Document {
    doc! {
        "$addToSet": { "achievements": def.id },
        "$inc": { "points": def.points_awarded },
        "$set": { "metadata.updated_at": DateTime::now() },
    }
}

/// Filter pinning the rating count the running average was computed
/// from. Documents predating the rating fields have no `rating_count`,
/// which the zero case must also match.
pub fn rating_update_filter(user_id: &str, old_count: i64) -> bson::Document {
    if old_count == 0 {
        doc! { "user_id": user_id, "rating_count": { "$in": [0_i64, null] } }
    } else {
        doc! { "user_id": user_id, "rating_count": old_count }
    }
}

/// Maintains the gamification counters on the user document
#[derive(Clone)]
pub struct GamificationEngine {
    users: MongoCollection<UserDoc>,
    cfg: ScoringConfig,
}

impl GamificationEngine {
    pub fn new(users: MongoCollection<UserDoc>, cfg: ScoringConfig) -> Self {
        Self { users, cfg }
    }

    async fn load_user(&self, user_id: &str) -> Result<UserDoc> {
        let mut user = self
            .users
            .find_one(doc! { "user_id": user_id })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user {}", user_id)))?;
        user.normalize_legacy();
        Ok(user)
    }

    /// Award points for a completed request and evaluate achievements.
    /// `completion_duration_ms` is the time between claim and
    /// completion as measured by the caller.
    pub async fn award_points_for_completion(
        &self,
        user_id: &str,
        request: &HelpRequestDoc,
        completion_duration_ms: i64,
    ) -> Result<CompletionAward> {
        let user = self.load_user(user_id).await?;
        let today = Utc::now().date_naive();

        let base_points = completion_points(&self.cfg, request.urgency, completion_duration_ms);
        let is_fast =
            completion_duration_ms <= self.cfg.fast_completion_window_hours * 3_600_000;
        let last = user
            .last_activity_date
            .as_deref()
            .and_then(|d| d.parse::<NaiveDate>().ok());
        let streak = advance_streak(last, today, user.streak_days);

        let category_key = format!("category_stats.{}", request.category);
        let now = DateTime::now();
        let mut increments = doc! {
            "points": base_points,
            "requests_completed": 1_i64,
            category_key: 1_i64,
        };
        if is_fast {
            increments.insert("fast_completions", 1_i64);
        }

        // Base award commits first; everything past this point is bonus.
        self.users
            .update_one(
                doc! { "user_id": user_id },
                doc! {
                    "$inc": increments,
                    "$set": {
                        "streak_days": streak,
                        "last_activity_date": today.to_string(),
                        "metadata.updated_at": now,
                    },
                },
            )
            .await?;

        let old_level = calculate_level(user.points);

        // Snapshot reflecting the write above
        let mut stats = UserStats {
            requests_completed: user.requests_completed + 1,
            rating_avg: user.rating_avg,
            rating_count: user.rating_count,
            streak_days: streak,
            fast_completions: user.fast_completions + if is_fast { 1 } else { 0 },
            early_claims: user.early_claims,
            points: user.points + base_points,
            category_stats: user.category_stats.clone(),
        };
        *stats
            .category_stats
            .entry(request.category.clone())
            .or_insert(0) += 1;

        let (unlocked, bonus_points) = match self.apply_achievements(user_id, &user, &stats).await {
            Ok(result) => result,
            Err(err) => {
                // The base award already committed; never roll it back
                // for a bonus failure.
                warn!(user_id, error = %err, "achievement evaluation failed, base award kept");
                (Vec::new(), 0)
            }
        };

        let total_points = stats.points + bonus_points;
        let new_level = calculate_level(total_points);
        let leveled_up = level_index(new_level) > level_index(old_level);
        if new_level != user.level {
            self.users
                .update_one(
                    doc! { "user_id": user_id },
                    doc! { "$set": { "level": new_level, "metadata.updated_at": DateTime::now() } },
                )
                .await?;
        }

        info!(
            user_id,
            points = base_points + bonus_points,
            unlocked = unlocked.len(),
            leveled_up,
            "completion award"
        );

        Ok(CompletionAward {
            points_awarded: base_points + bonus_points,
            unlocked,
            leveled_up,
            new_level: new_level.to_string(),
        })
    }

    /// Fold a new rating into the running average and re-evaluate the
    /// rating-based achievements. The write is optimistic: its filter
    /// pins the rating count the average was computed from, so a
    /// concurrent rating forces a reload instead of silently dropping
    /// a sample from the average.
    pub async fn update_rating_stats(&self, user_id: &str, new_rating: f64) -> Result<()> {
        const MAX_ATTEMPTS: u32 = 3;

        let mut user = self.load_user(user_id).await?;
        let mut attempt = 0;
        loop {
            let avg = next_rating_avg(user.rating_avg, user.rating_count, new_rating);
            let result = self
                .users
                .update_one(
                    rating_update_filter(user_id, user.rating_count),
                    doc! {
                        "$set": {
                            "rating_avg": avg,
                            "metadata.updated_at": DateTime::now(),
                        },
                        "$inc": { "rating_count": 1_i64 },
                    },
                )
                .await?;

            if result.modified_count == 1 {
                let stats = UserStats {
                    requests_completed: user.requests_completed,
                    rating_avg: avg,
                    rating_count: user.rating_count + 1,
                    streak_days: user.streak_days,
                    fast_completions: user.fast_completions,
                    early_claims: user.early_claims,
                    points: user.points,
                    category_stats: user.category_stats.clone(),
                };
                self.apply_achievements(user_id, &user, &stats).await?;
                return Ok(());
            }

            attempt += 1;
            if attempt >= MAX_ATTEMPTS {
                return Err(EngineError::Internal(format!(
                    "rating update for {} lost {} optimistic retries",
                    user_id, MAX_ATTEMPTS
                )));
            }
            debug!(user_id, attempt, "rating count moved, reloading");
            user = self.load_user(user_id).await?;
        }
    }

    /// Count a claim made within the early window of request creation
    pub async fn track_early_claim(
        &self,
        user_id: &str,
        request_created_at: DateTime,
        claimed_at: DateTime,
    ) -> Result<()> {
        let latency_ms = claimed_at.timestamp_millis() - request_created_at.timestamp_millis();
        if latency_ms > self.cfg.early_claim_window_hours * 3_600_000 {
            debug!(user_id, latency_ms, "claim outside early window, not counted");
            return Ok(());
        }

        let user = self.load_user(user_id).await?;
        self.users
            .update_one(
                doc! { "user_id": user_id },
                doc! {
                    "$inc": { "early_claims": 1_i64 },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;

        let stats = UserStats {
            requests_completed: user.requests_completed,
            rating_avg: user.rating_avg,
            rating_count: user.rating_count,
            streak_days: user.streak_days,
            fast_completions: user.fast_completions,
            early_claims: user.early_claims + 1,
            points: user.points,
            category_stats: user.category_stats.clone(),
        };
        self.apply_achievements(user_id, &user, &stats).await?;
        Ok(())
    }

    /// Evaluate the catalog against a stats snapshot and persist any
    /// new unlocks with their bonus points. Each unlock is its own
    /// conditional update whose filter excludes users already holding
    /// the achievement, so of two concurrent evaluations exactly one
    /// credits the bonus; the loser matches nothing and moves on.
    async fn apply_achievements(
        &self,
        user_id: &str,
        user: &UserDoc,
        stats: &UserStats,
    ) -> Result<(Vec<String>, i64)> {
        let candidates = newly_unlocked(stats, &user.achievements, catalog());
        if candidates.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let mut ids = Vec::new();
        let mut bonus = 0_i64;
        for def in candidates {
            let result = self
                .users
                .update_one(
                    achievement_award_filter(user_id, def.id),
                    achievement_award_update(def),
                )
                .await?;
            // modified_count 0 means a concurrent evaluation got there
            // first; the bonus was credited exactly once, by them.
            if result.modified_count == 1 {
                ids.push(def.id.to_string());
                bonus += def.points_awarded;
            }
        }

        if !ids.is_empty() {
            info!(user_id, achievements = ?ids, bonus, "achievements unlocked");
        }
        Ok((ids, bonus))
    }

    /// Read accessor: current points, level, and achievements
    pub async fn get_reputation(&self, user_id: &str) -> Result<UserReputation> {
        let user = self.load_user(user_id).await?;
        Ok(UserReputation {
            trust_score: user.trust_score,
            points: user.points,
            level: calculate_level(user.points).to_string(),
            achievements: user.achievements.iter().cloned().collect(),
            streak_days: user.streak_days,
        })
    }
}

/// Current reputation snapshot exposed to the UI layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReputation {
    pub trust_score: i32,
    pub points: i64,
    pub level: String,
    pub achievements: Vec<String>,
    pub streak_days: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ScoringConfig {
        ScoringConfig::default()
    }

    #[test]
    fn test_high_urgency_fast_completion_scores_twenty() {
        // 10 base + 5 high urgency + 5 fast (2h < 24h window)
        let points = completion_points(&cfg(), Urgency::High, 2 * 3_600_000);
        assert_eq!(points, 20);
    }

    #[test]
    fn test_medium_urgency_slow_completion() {
        // 10 base + 3 medium, no fast bonus at 48h
        let points = completion_points(&cfg(), Urgency::Medium, 48 * 3_600_000);
        assert_eq!(points, 13);
    }

    #[test]
    fn test_low_urgency_base_only() {
        let points = completion_points(&cfg(), Urgency::Low, 30 * 3_600_000);
        assert_eq!(points, 10);
    }

    #[test]
    fn test_streak_extends_from_yesterday() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        assert_eq!(advance_streak(Some(yesterday), today, 4), 5);
    }

    #[test]
    fn test_streak_unchanged_same_day() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        assert_eq!(advance_streak(Some(today), today, 4), 4);
        // A same-day completion still counts as day one of a streak
        assert_eq!(advance_streak(Some(today), today, 0), 1);
    }

    #[test]
    fn test_streak_resets_after_gap() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let last_week = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        assert_eq!(advance_streak(Some(last_week), today, 12), 1);
        assert_eq!(advance_streak(None, today, 0), 1);
    }

    #[test]
    fn test_bonus_award_filter_excludes_holders() {
        // The unlock write only matches while the achievement is
        // absent, so two racing evaluations cannot both credit the
        // bonus: the second matches nothing.
        let filter = achievement_award_filter("u1", "first_help");
        assert_eq!(
            filter,
            doc! { "user_id": "u1", "achievements": { "$ne": "first_help" } }
        );

        let def = crate::gamification::achievements::catalog()
            .iter()
            .find(|d| d.id == "first_help")
            .unwrap();
        let update = achievement_award_update(def);
        assert_eq!(
            update.get_document("$addToSet").unwrap(),
            &doc! { "achievements": "first_help" }
        );
        // One bonus per unlock, never a batched sum
        assert_eq!(
            update.get_document("$inc").unwrap(),
            &doc! { "points": def.points_awarded }
        );
    }

    #[test]
    fn test_rating_filter_pins_observed_count() {
        assert_eq!(
            rating_update_filter("u1", 4),
            doc! { "user_id": "u1", "rating_count": 4_i64 }
        );
        // Documents predating the rating fields carry no count at all
        assert_eq!(
            rating_update_filter("u1", 0),
            doc! { "user_id": "u1", "rating_count": { "$in": [0_i64, null] } }
        );
    }

    #[test]
    fn test_rating_running_average() {
        let avg = next_rating_avg(0.0, 0, 4.0);
        assert_eq!(avg, 4.0);

        let avg = next_rating_avg(4.0, 1, 5.0);
        assert_eq!(avg, 4.5);

        let avg = next_rating_avg(4.5, 2, 3.0);
        assert!((avg - 4.0).abs() < 1e-9);
    }
}
