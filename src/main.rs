//! Commons engine daemon
//!
//! Connects to MongoDB and runs the daily trust-score sweep across all
//! active communities. Event-driven recomputation happens in-process
//! in the UI-facing deployment; this binary exists for the time-driven
//! half of the scheduling contract.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commons_engine::config::{Args, ScoringConfig};
use commons_engine::db::schemas::{
    CommunityDoc, HelpRequestDoc, RatingDoc, UserDoc, ADMIN_ACTION_COLLECTION,
    COMMUNITY_COLLECTION, HELP_REQUEST_COLLECTION, RATING_COLLECTION, USER_COLLECTION,
};
use commons_engine::db::MongoClient;
use commons_engine::gamification::GamificationEngine;
use commons_engine::reputation::TrustScoreEngine;
use commons_engine::scheduler::{next_run_after, ReputationScheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("commons_engine={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Commons Engine - reputation daemon");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Sweep hour (UTC): {:02}:00", args.sweep_hour_utc);
    info!("Staleness window: {}h", args.trust_stale_after_hours);
    info!("Mode: {}", if args.oneshot { "ONESHOT" } else { "DAEMON" });
    info!("======================================");

    // Connect to MongoDB
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let users = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
    let communities = mongo.collection::<CommunityDoc>(COMMUNITY_COLLECTION).await?;
    let help_requests = mongo
        .collection::<HelpRequestDoc>(HELP_REQUEST_COLLECTION)
        .await?;
    let ratings = mongo.collection::<RatingDoc>(RATING_COLLECTION).await?;
    // Index creation for the audit log happens here even though this
    // binary never writes to it
    let _audit = mongo
        .collection::<commons_engine::db::schemas::AdminActionDoc>(ADMIN_ACTION_COLLECTION)
        .await?;

    let cfg = ScoringConfig {
        trust_stale_after_hours: args.trust_stale_after_hours,
        ..ScoringConfig::default()
    };

    let trust = TrustScoreEngine::new(
        users.clone(),
        help_requests.clone(),
        ratings.clone(),
        cfg.clone(),
    );
    let gamification = GamificationEngine::new(users.clone(), cfg.clone());
    let scheduler = ReputationScheduler::new(trust, gamification, users, communities, cfg);

    if args.oneshot {
        scheduler.sweep_all_communities().await?;
        info!("oneshot sweep complete, exiting");
        return Ok(());
    }

    loop {
        let now = chrono::Utc::now();
        let next = next_run_after(now, args.sweep_hour_utc);
        let wait = (next - now)
            .to_std()
            .unwrap_or_else(|_| std::time::Duration::from_secs(60));
        info!("next sweep at {} ({}s from now)", next, wait.as_secs());

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                if let Err(e) = scheduler.sweep_all_communities().await {
                    error!("sweep failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, exiting");
                return Ok(());
            }
        }
    }
}
