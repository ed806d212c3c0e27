//! Reputation scheduler
//!
//! Two triggers drive trust-score recomputation: events (a completion,
//! rating, or report touches the affected user immediately) and the
//! daily batch sweep (every member of a community whose cached score
//! has gone stale). Users in a batch are independent: one failure is
//! logged and skipped, never aborting the siblings.
//!
//! The "when does the next sweep run" question is a pure function of
//! the current time, so there is no in-process timer state to reason
//! about across restarts. A cron-driven deployment can call
//! `update_outdated_trust_scores` directly instead.

use bson::{doc, DateTime};
use chrono::{DateTime as ChronoDateTime, Datelike, Duration, TimeZone, Utc};
use tracing::{info, warn};

use crate::config::ScoringConfig;
use crate::db::schemas::{CommunityDoc, UserDoc};
use crate::db::MongoCollection;
use crate::gamification::GamificationEngine;
use crate::reputation::TrustScoreEngine;
use crate::types::Result;

/// Outcome of one community sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Users whose score was recomputed
    pub updated: usize,
    /// Users whose cached score was still fresh
    pub skipped: usize,
    /// Users whose recomputation failed (logged, not fatal)
    pub failed: usize,
}

/// The next daily sweep time at `hour_utc` strictly after `now`
pub fn next_run_after(now: ChronoDateTime<Utc>, hour_utc: u32) -> ChronoDateTime<Utc> {
    let candidate = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hour_utc, 0, 0)
        .single()
        .unwrap_or(now);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

/// Whether a cached score is due for recomputation
pub fn is_stale(updated_at: Option<DateTime>, now: ChronoDateTime<Utc>, stale_after_hours: i64) -> bool {
    match updated_at {
        Some(ts) => {
            let age_ms = now.timestamp_millis() - ts.timestamp_millis();
            age_ms > stale_after_hours * 3_600_000
        }
        // Never computed
        None => true,
    }
}

/// Drives trust-score recomputation on both triggers
#[derive(Clone)]
pub struct ReputationScheduler {
    trust: TrustScoreEngine,
    gamification: GamificationEngine,
    users: MongoCollection<UserDoc>,
    communities: MongoCollection<CommunityDoc>,
    cfg: ScoringConfig,
}

impl ReputationScheduler {
    pub fn new(
        trust: TrustScoreEngine,
        gamification: GamificationEngine,
        users: MongoCollection<UserDoc>,
        communities: MongoCollection<CommunityDoc>,
        cfg: ScoringConfig,
    ) -> Self {
        Self {
            trust,
            gamification,
            users,
            communities,
            cfg,
        }
    }

    /// Event trigger: a request was completed by `user_id`
    pub async fn on_request_completed(&self, user_id: &str) -> Result<()> {
        self.trust.update_user_trust_score(user_id).await?;
        Ok(())
    }

    /// Event trigger: `user_id` received a rating
    pub async fn on_rating_received(&self, user_id: &str, stars: f64) -> Result<()> {
        self.gamification.update_rating_stats(user_id, stars).await?;
        self.trust.update_user_trust_score(user_id).await?;
        Ok(())
    }

    /// Event trigger: a report was filed against `user_id`
    pub async fn on_report_filed(&self, user_id: &str) -> Result<()> {
        self.users
            .update_one(
                doc! { "user_id": user_id },
                doc! {
                    "$inc": { "report_count": 1_i64 },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;
        self.trust.update_user_trust_score(user_id).await?;
        Ok(())
    }

    /// Batch trigger: recompute every member of `community_id` whose
    /// cached score is older than the staleness window. Per-user
    /// failures are logged and skipped.
    pub async fn update_outdated_trust_scores(&self, community_id: &str) -> Result<SweepReport> {
        let member_key = format!("communities.{}", community_id);
        let members = self
            .users
            .find_many(doc! { member_key: { "$exists": true } })
            .await?;

        let now = Utc::now();
        let mut report = SweepReport::default();

        for member in &members {
            if !is_stale(member.trust_score_updated_at, now, self.cfg.trust_stale_after_hours) {
                report.skipped += 1;
                continue;
            }
            match self.trust.update_user_trust_score(&member.user_id).await {
                Ok(_) => report.updated += 1,
                Err(err) => {
                    warn!(
                        user_id = %member.user_id,
                        community_id,
                        error = %err,
                        "trust score recompute failed, skipping user"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            community_id,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "trust score sweep finished"
        );
        Ok(report)
    }

    /// Sweep every active community. Community failures are as
    /// independent as user failures within one.
    pub async fn sweep_all_communities(&self) -> Result<()> {
        let communities = self.communities.find_many(doc! { "active": true }).await?;
        info!(count = communities.len(), "starting sweep of active communities");

        for community in &communities {
            if let Err(err) = self.update_outdated_trust_scores(&community.community_id).await {
                warn!(
                    community_id = %community.community_id,
                    error = %err,
                    "community sweep failed, continuing with the rest"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 1, 30, 0).unwrap();
        let next = next_run_after(now, 2);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 10, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 2, 0, 0).unwrap();
        let next = next_run_after(now, 2);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 11, 2, 0, 0).unwrap());

        let later = Utc.with_ymd_and_hms(2025, 6, 10, 17, 45, 0).unwrap();
        assert_eq!(
            next_run_after(later, 2),
            Utc.with_ymd_and_hms(2025, 6, 11, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_is_always_in_the_future() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert!(next_run_after(now, 2) > now);
        assert!(next_run_after(now, 23) > now);
    }

    #[test]
    fn test_staleness() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();

        // Never computed
        assert!(is_stale(None, now, 24));

        let fresh = DateTime::from_millis(now.timestamp_millis() - 3_600_000); // 1h old
        assert!(!is_stale(Some(fresh), now, 24));

        let stale = DateTime::from_millis(now.timestamp_millis() - 25 * 3_600_000);
        assert!(is_stale(Some(stale), now, 24));
    }
}
