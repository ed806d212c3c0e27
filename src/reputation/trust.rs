//! Trust score engine
//!
//! Combines seven behavioral metrics, each normalized to 0-100, into
//! one weighted integer score with a qualitative level. Every metric
//! has a default for missing sub-data; the engine never fails outright
//! on an incomplete history, favoring a less precise score over none.
//!
//! `calculate_trust_score` is read-only. `update_user_trust_score` is
//! the explicit persistence step, so computation and mutation stay
//! independently testable.

use bson::{doc, DateTime};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ScoringConfig, TrustWeights};
use crate::db::schemas::{HelpRequestDoc, HelpRequestStatus, RatingDoc, UserDoc};
use crate::db::MongoCollection;
use crate::types::Result;

/// Score given to a brand-new user with no record at all
pub const NEW_USER_SCORE: i32 = 50;

/// Aggregated history the metrics are computed from
#[derive(Debug, Clone, Default)]
pub struct TrustInputs {
    /// Requests the user has claimed as a volunteer
    pub claimed_count: i64,
    /// Claimed requests the user completed
    pub completed_count: i64,
    /// Average claim latency in milliseconds, if any claims exist
    pub avg_claim_latency_ms: Option<i64>,
    /// Average of ratings received, if any
    pub rating_avg: Option<f64>,
    /// Days since account creation, if known
    pub account_age_days: Option<i64>,
    /// Total requests the user has touched (claimed + created)
    pub total_requests: i64,
    /// Reports filed against the user
    pub report_count: i64,
    /// Verification flags
    pub email_verified: bool,
    pub phone_verified: bool,
    pub id_verified: bool,
}

/// Per-metric subscores, the weights used, and the combined result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustScoreBreakdown {
    pub completion_rate: f64,
    pub response_time: f64,
    pub rating: f64,
    pub account_age: f64,
    pub activity_level: f64,
    pub report_history: f64,
    pub verification_status: f64,
    /// Combined 0-100 integer score
    pub score: i32,
    /// Qualitative level derived from the score
    pub level: String,
}

/// Completed / claimed ratio scaled to 0-100; 75 when nothing claimed
pub fn completion_rate_score(claimed: i64, completed: i64) -> f64 {
    if claimed <= 0 {
        return 75.0;
    }
    (completed as f64 / claimed as f64 * 100.0).clamp(0.0, 100.0)
}

/// Bucketed score from average claim latency; 75 with no claims
pub fn response_time_score(avg_latency_ms: Option<i64>) -> f64 {
    let Some(ms) = avg_latency_ms else {
        return 75.0;
    };
    let hours = ms as f64 / 3_600_000.0;
    if hours < 1.0 {
        100.0
    } else if hours < 6.0 {
        90.0
    } else if hours < 24.0 {
        80.0
    } else if hours < 48.0 {
        70.0
    } else {
        60.0
    }
}

/// Average rating on a 5-point scale mapped to 0-100; 75 with none
pub fn rating_score(avg: Option<f64>) -> f64 {
    match avg {
        Some(avg) => (avg / 5.0 * 100.0).clamp(0.0, 100.0),
        None => 75.0,
    }
}

/// Bucketed by days since account creation; unknown age scores lowest
pub fn account_age_score(age_days: Option<i64>) -> f64 {
    let Some(days) = age_days else {
        return 60.0;
    };
    if days > 365 {
        100.0
    } else if days > 180 {
        90.0
    } else if days > 90 {
        80.0
    } else if days >= 30 {
        70.0
    } else {
        60.0
    }
}

/// Bucketed by total requests claimed + created
pub fn activity_score(total_requests: i64) -> f64 {
    if total_requests > 50 {
        100.0
    } else if total_requests > 25 {
        90.0
    } else if total_requests > 10 {
        80.0
    } else if total_requests >= 5 {
        70.0
    } else {
        60.0
    }
}

/// 100 minus 15 per report, floored at 0
pub fn report_score(report_count: i64) -> f64 {
    (100.0 - 15.0 * report_count as f64).max(0.0)
}

/// Additive: 40 for email, 30 for phone, 30 for verified ID
pub fn verification_score(email: bool, phone: bool, id: bool) -> f64 {
    let mut score = 0.0;
    if email {
        score += 40.0;
    }
    if phone {
        score += 30.0;
    }
    if id {
        score += 30.0;
    }
    score
}

/// Qualitative level for a combined score
pub fn trust_level(score: i32) -> &'static str {
    if score >= 90 {
        "Excellent"
    } else if score >= 80 {
        "Very Good"
    } else if score >= 70 {
        "Good"
    } else if score >= 60 {
        "Fair"
    } else if score >= 50 {
        "Average"
    } else {
        "Needs Improvement"
    }
}

/// Combine the metrics under the configured weights
pub fn combine(inputs: &TrustInputs, weights: &TrustWeights) -> TrustScoreBreakdown {
    let completion_rate = completion_rate_score(inputs.claimed_count, inputs.completed_count);
    let response_time = response_time_score(inputs.avg_claim_latency_ms);
    let rating = rating_score(inputs.rating_avg);
    let account_age = account_age_score(inputs.account_age_days);
    let activity_level = activity_score(inputs.total_requests);
    let report_history = report_score(inputs.report_count);
    let verification_status =
        verification_score(inputs.email_verified, inputs.phone_verified, inputs.id_verified);

    let weighted = completion_rate * weights.completion_rate
        + response_time * weights.response_time
        + rating * weights.rating
        + account_age * weights.account_age
        + activity_level * weights.activity_level
        + report_history * weights.report_history
        + verification_status * weights.verification_status;
    let score = (weighted.round() as i32).clamp(0, 100);

    TrustScoreBreakdown {
        completion_rate,
        response_time,
        rating,
        account_age,
        activity_level,
        report_history,
        verification_status,
        score,
        level: trust_level(score).to_string(),
    }
}

/// Breakdown for a user with no record at all. The subscores are
/// zeroed rather than defaulted: with no user document there is no
/// history to score, and publishing per-metric defaults here would let
/// a consumer recompute a weighted total contradicting the fixed
/// new-user score of 50.
fn new_user_breakdown() -> TrustScoreBreakdown {
    TrustScoreBreakdown {
        completion_rate: 0.0,
        response_time: 0.0,
        rating: 0.0,
        account_age: 0.0,
        activity_level: 0.0,
        report_history: 0.0,
        verification_status: 0.0,
        score: NEW_USER_SCORE,
        level: "New User".to_string(),
    }
}

/// Computes and persists trust scores
#[derive(Clone)]
pub struct TrustScoreEngine {
    users: MongoCollection<UserDoc>,
    help_requests: MongoCollection<HelpRequestDoc>,
    ratings: MongoCollection<RatingDoc>,
    cfg: ScoringConfig,
}

impl TrustScoreEngine {
    pub fn new(
        users: MongoCollection<UserDoc>,
        help_requests: MongoCollection<HelpRequestDoc>,
        ratings: MongoCollection<RatingDoc>,
        cfg: ScoringConfig,
    ) -> Self {
        Self {
            users,
            help_requests,
            ratings,
            cfg,
        }
    }

    /// Gather a user's aggregated request and rating history
    async fn gather_inputs(&self, user: &UserDoc) -> Result<TrustInputs> {
        let claimed = self
            .help_requests
            .find_many(doc! { "claimed_by": &user.user_id })
            .await?;
        let created_count = self
            .help_requests
            .count(doc! { "created_by": &user.user_id })
            .await? as i64;

        let claimed_count = claimed.len() as i64;
        let completed_count = claimed
            .iter()
            .filter(|r| r.status == HelpRequestStatus::Completed)
            .count() as i64;

        let latencies: Vec<i64> = claimed.iter().filter_map(|r| r.claim_latency_ms()).collect();
        let avg_claim_latency_ms = if latencies.is_empty() {
            None
        } else {
            Some(latencies.iter().sum::<i64>() / latencies.len() as i64)
        };

        let ratings = self
            .ratings
            .find_many(doc! { "rated_user_id": &user.user_id })
            .await?;
        let rating_avg = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().map(|r| r.stars as f64).sum::<f64>() / ratings.len() as f64)
        };

        let account_age_days = user.metadata.created_at.map(|created| {
            let age_ms = Utc::now().timestamp_millis() - created.timestamp_millis();
            age_ms / 86_400_000
        });

        Ok(TrustInputs {
            claimed_count,
            completed_count,
            avg_claim_latency_ms,
            rating_avg,
            account_age_days,
            total_requests: claimed_count + created_count,
            report_count: user.report_count,
            email_verified: user.email_verified,
            phone_verified: user.phone_verified,
            id_verified: user.id_verified,
        })
    }

    /// Compute the composite score and per-metric breakdown. Read-only;
    /// a missing user yields the New User default instead of an error.
    pub async fn calculate_trust_score(&self, user_id: &str) -> Result<TrustScoreBreakdown> {
        let Some(user) = self.users.find_one(doc! { "user_id": user_id }).await? else {
            debug!(user_id, "no user record, returning new-user default");
            return Ok(new_user_breakdown());
        };

        let inputs = self.gather_inputs(&user).await?;
        let breakdown = combine(&inputs, &self.cfg.weights);
        debug!(user_id, score = breakdown.score, level = %breakdown.level, "trust score computed");
        Ok(breakdown)
    }

    /// Recompute and write the denormalized cache on the user document
    pub async fn update_user_trust_score(&self, user_id: &str) -> Result<TrustScoreBreakdown> {
        let breakdown = self.calculate_trust_score(user_id).await?;

        self.users
            .update_one(
                doc! { "user_id": user_id },
                doc! { "$set": {
                    "trust_score": breakdown.score,
                    "trust_score_updated_at": DateTime::now(),
                    "metadata.updated_at": DateTime::now(),
                }},
            )
            .await?;

        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults_to_fifty() {
        let breakdown = new_user_breakdown();
        assert_eq!(breakdown.score, 50);
        assert_eq!(breakdown.level, "New User");
        // No history, no subscores: nothing to recompute a different
        // total from
        assert_eq!(breakdown.completion_rate, 0.0);
        assert_eq!(breakdown.rating, 0.0);
        assert_eq!(breakdown.report_history, 0.0);
        assert_eq!(breakdown.verification_status, 0.0);
    }

    #[test]
    fn test_completion_rate_defaults_without_claims() {
        assert_eq!(completion_rate_score(0, 0), 75.0);
        assert_eq!(completion_rate_score(10, 10), 100.0);
        assert_eq!(completion_rate_score(10, 5), 50.0);
    }

    #[test]
    fn test_response_time_buckets() {
        assert_eq!(response_time_score(None), 75.0);
        assert_eq!(response_time_score(Some(30 * 60 * 1000)), 100.0); // 30m
        assert_eq!(response_time_score(Some(3 * 3_600_000)), 90.0); // 3h
        assert_eq!(response_time_score(Some(12 * 3_600_000)), 80.0); // 12h
        assert_eq!(response_time_score(Some(36 * 3_600_000)), 70.0); // 36h
        assert_eq!(response_time_score(Some(72 * 3_600_000)), 60.0); // 72h
    }

    #[test]
    fn test_rating_scaling() {
        assert_eq!(rating_score(None), 75.0);
        assert_eq!(rating_score(Some(5.0)), 100.0);
        assert_eq!(rating_score(Some(2.5)), 50.0);
    }

    #[test]
    fn test_account_age_buckets() {
        assert_eq!(account_age_score(None), 60.0);
        assert_eq!(account_age_score(Some(400)), 100.0);
        assert_eq!(account_age_score(Some(200)), 90.0);
        assert_eq!(account_age_score(Some(100)), 80.0);
        assert_eq!(account_age_score(Some(45)), 70.0);
        assert_eq!(account_age_score(Some(10)), 60.0);
    }

    #[test]
    fn test_activity_buckets() {
        assert_eq!(activity_score(60), 100.0);
        assert_eq!(activity_score(30), 90.0);
        assert_eq!(activity_score(15), 80.0);
        assert_eq!(activity_score(5), 70.0);
        assert_eq!(activity_score(2), 60.0);
    }

    #[test]
    fn test_report_score_floors_at_zero() {
        assert_eq!(report_score(0), 100.0);
        assert_eq!(report_score(2), 70.0);
        assert_eq!(report_score(7), 0.0);
        assert_eq!(report_score(100), 0.0);
    }

    #[test]
    fn test_verification_is_additive() {
        assert_eq!(verification_score(false, false, false), 0.0);
        assert_eq!(verification_score(true, false, false), 40.0);
        assert_eq!(verification_score(true, true, false), 70.0);
        assert_eq!(verification_score(true, true, true), 100.0);
    }

    #[test]
    fn test_trust_levels() {
        assert_eq!(trust_level(95), "Excellent");
        assert_eq!(trust_level(85), "Very Good");
        assert_eq!(trust_level(75), "Good");
        assert_eq!(trust_level(65), "Fair");
        assert_eq!(trust_level(55), "Average");
        assert_eq!(trust_level(40), "Needs Improvement");
    }

    #[test]
    fn test_combine_perfect_history() {
        let inputs = TrustInputs {
            claimed_count: 60,
            completed_count: 60,
            avg_claim_latency_ms: Some(10 * 60 * 1000),
            rating_avg: Some(5.0),
            account_age_days: Some(400),
            total_requests: 80,
            report_count: 0,
            email_verified: true,
            phone_verified: true,
            id_verified: true,
        };
        let breakdown = combine(&inputs, &TrustWeights::default());
        assert_eq!(breakdown.score, 100);
        assert_eq!(breakdown.level, "Excellent");
    }

    #[test]
    fn test_combine_is_weighted_average() {
        // All subscores at their missing-data defaults
        let inputs = TrustInputs::default();
        let weights = TrustWeights::default();
        let breakdown = combine(&inputs, &weights);

        let expected = 75.0 * weights.completion_rate
            + 75.0 * weights.response_time
            + 75.0 * weights.rating
            + 60.0 * weights.account_age
            + 60.0 * weights.activity_level
            + 100.0 * weights.report_history
            + 0.0 * weights.verification_status;
        assert_eq!(breakdown.score, expected.round() as i32);
    }
}
