//! Shared MongoDB harness for store-coupled tests
//!
//! These tests exercise the real conditional and transactional writes
//! and need a running MongoDB reachable as a replica set (transactions
//! require one). Set MONGODB_TEST_URI to enable them; without it every
//! test skips itself. Each harness uses a fresh database name so tests
//! never see each other's documents.

// Each test binary uses a different slice of the harness.
#![allow(dead_code)]

use commons_engine::config::ScoringConfig;
use commons_engine::db::schemas::{
    AdminActionDoc, CommunityDoc, HelpRequestDoc, JoinRequestDoc, RatingDoc, UserDoc,
    ADMIN_ACTION_COLLECTION, COMMUNITY_COLLECTION, HELP_REQUEST_COLLECTION,
    JOIN_REQUEST_COLLECTION, RATING_COLLECTION, USER_COLLECTION,
};
use commons_engine::db::{MongoClient, MongoCollection};
use commons_engine::gamification::GamificationEngine;
use commons_engine::membership::JoinRequestService;
use uuid::Uuid;

pub struct Harness {
    pub users: MongoCollection<UserDoc>,
    pub communities: MongoCollection<CommunityDoc>,
    pub requests: MongoCollection<JoinRequestDoc>,
    pub join: JoinRequestService,
    pub gamification: GamificationEngine,
}

/// Connect to the test MongoDB, or None when MONGODB_TEST_URI is unset
pub async fn harness() -> Option<Harness> {
    let uri = match std::env::var("MONGODB_TEST_URI") {
        Ok(uri) => uri,
        Err(_) => {
            eprintln!("MONGODB_TEST_URI not set, skipping store-coupled test");
            return None;
        }
    };

    let db_name = format!("commons_test_{}", Uuid::new_v4().simple());
    let mongo = MongoClient::new(&uri, &db_name)
        .await
        .expect("test MongoDB reachable");

    let users = mongo.collection::<UserDoc>(USER_COLLECTION).await.unwrap();
    let communities = mongo
        .collection::<CommunityDoc>(COMMUNITY_COLLECTION)
        .await
        .unwrap();
    let requests = mongo
        .collection::<JoinRequestDoc>(JOIN_REQUEST_COLLECTION)
        .await
        .unwrap();
    let audit = mongo
        .collection::<AdminActionDoc>(ADMIN_ACTION_COLLECTION)
        .await
        .unwrap();
    // Created so read-side indexes exist even though these tests only
    // drive the membership and gamification paths
    let _help_requests = mongo
        .collection::<HelpRequestDoc>(HELP_REQUEST_COLLECTION)
        .await
        .unwrap();
    let _ratings = mongo.collection::<RatingDoc>(RATING_COLLECTION).await.unwrap();

    let join = JoinRequestService::new(
        mongo.clone(),
        requests.clone(),
        users.clone(),
        communities.clone(),
        audit,
    );
    let gamification = GamificationEngine::new(users.clone(), ScoringConfig::default());

    Some(Harness {
        users,
        communities,
        requests,
        join,
        gamification,
    })
}

/// Insert a plain user with no history
pub async fn seed_user(h: &Harness, user_id: &str) {
    h.users
        .insert_one(UserDoc::new(user_id.into(), format!("{} display", user_id)))
        .await
        .unwrap();
}

/// Insert an active community with a starting member count
pub async fn seed_community(h: &Harness, community_id: &str, member_count: i64) {
    let mut community = CommunityDoc::new(community_id.into(), format!("{} community", community_id));
    community.member_count = member_count;
    h.communities.insert_one(community).await.unwrap();
}
