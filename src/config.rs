//! Configuration for the Commons engine
//!
//! CLI arguments and environment variable handling using clap, plus the
//! scoring constants. The trust weights and point values are kept as
//! configuration defaults rather than literals scattered through the
//! engine.

use clap::Parser;
use uuid::Uuid;

use crate::types::{EngineError, Result};

/// Commons engine daemon - runs the reputation scheduler against MongoDB
#[derive(Parser, Debug, Clone)]
#[command(name = "commons-engined")]
#[command(about = "Membership & reputation engine daemon for the Commons platform")]
pub struct Args {
    /// Unique node identifier for this engine instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "commons")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Hour of day (UTC) for the daily trust-score sweep
    #[arg(long, env = "SWEEP_HOUR_UTC", default_value = "2")]
    pub sweep_hour_utc: u32,

    /// Cached trust scores older than this many hours are recomputed
    /// by the daily sweep
    #[arg(long, env = "TRUST_STALE_AFTER_HOURS", default_value = "24")]
    pub trust_stale_after_hours: i64,

    /// Run a single sweep across all active communities and exit
    /// (for cron-driven deployments)
    #[arg(long, env = "ONESHOT", default_value = "false")]
    pub oneshot: bool,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sweep_hour_utc > 23 {
            return Err(EngineError::Config(
                "SWEEP_HOUR_UTC must be in 0..=23".to_string(),
            ));
        }
        if self.trust_stale_after_hours <= 0 {
            return Err(EngineError::Config(
                "TRUST_STALE_AFTER_HOURS must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Weights combining the seven trust metrics into one 0-100 score.
/// Must sum to 1.0.
#[derive(Debug, Clone, Copy)]
pub struct TrustWeights {
    pub completion_rate: f64,
    pub response_time: f64,
    pub rating: f64,
    pub account_age: f64,
    pub activity_level: f64,
    pub report_history: f64,
    pub verification_status: f64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self {
            completion_rate: 0.25,
            response_time: 0.15,
            rating: 0.20,
            account_age: 0.10,
            activity_level: 0.15,
            report_history: 0.10,
            verification_status: 0.05,
        }
    }
}

impl TrustWeights {
    /// Sum of all weights (1.0 for a valid configuration)
    pub fn total(&self) -> f64 {
        self.completion_rate
            + self.response_time
            + self.rating
            + self.account_age
            + self.activity_level
            + self.report_history
            + self.verification_status
    }
}

/// Tuning constants for trust scoring and point awards
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Trust metric weights
    pub weights: TrustWeights,
    /// Base points for any completed request
    pub base_points: i64,
    /// Extra points for completing a high-urgency request
    pub high_urgency_bonus: i64,
    /// Extra points for completing a medium-urgency request
    pub medium_urgency_bonus: i64,
    /// Extra points when completion lands within the fast window
    pub fast_completion_bonus: i64,
    /// Completion within this many hours of the claim counts as fast
    pub fast_completion_window_hours: i64,
    /// Claim within this many hours of request creation counts as early
    pub early_claim_window_hours: i64,
    /// Cached trust scores older than this are recomputed by the sweep
    pub trust_stale_after_hours: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: TrustWeights::default(),
            base_points: 10,
            high_urgency_bonus: 5,
            medium_urgency_bonus: 3,
            fast_completion_bonus: 5,
            fast_completion_window_hours: 24,
            early_claim_window_hours: 1,
            trust_stale_after_hours: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = TrustWeights::default();
        assert!((weights.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let mut args = Args::parse_from(["commons-engined"]);
        assert!(args.validate().is_ok());

        args.sweep_hour_utc = 24;
        assert!(matches!(args.validate(), Err(EngineError::Config(_))));

        args.sweep_hour_utc = 2;
        args.trust_stale_after_hours = 0;
        assert!(matches!(args.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_default_scoring_config() {
        let cfg = ScoringConfig::default();
        assert_eq!(cfg.base_points, 10);
        assert_eq!(cfg.high_urgency_bonus, 5);
        assert_eq!(cfg.medium_urgency_bonus, 3);
        assert_eq!(cfg.fast_completion_bonus, 5);
        assert_eq!(cfg.fast_completion_window_hours, 24);
        assert_eq!(cfg.early_claim_window_hours, 1);
    }
}
