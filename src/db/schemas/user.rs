//! User document schema
//!
//! The single document the engine owns most of: platform role,
//! community memberships, the cached trust score, and all gamification
//! counters. Fields owned by this engine must only be mutated through
//! engine operations, never by ad hoc writes.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::auth::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Per-community role held by a user
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommunityRole {
    #[default]
    Member,
    Admin,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// External auth identifier
    pub user_id: String,

    /// Display name shown in the UI
    #[serde(default)]
    pub display_name: String,

    /// Platform-wide role (None = ordinary member)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Community a community_admin role is scoped to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_community_id: Option<String>,

    /// Community memberships: community_id -> role within that community
    #[serde(default)]
    pub communities: HashMap<String, CommunityRole>,

    /// The community shown by default in the UI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_community_id: Option<String>,

    /// Legacy single-membership field; normalized into `communities`
    /// by [`UserDoc::normalize_legacy`] at the read boundary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,

    /// Cached composite trust score (0-100)
    #[serde(default = "default_trust_score")]
    pub trust_score: i32,

    /// When the cached trust score was last recomputed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_score_updated_at: Option<DateTime>,

    /// Total gamification points
    #[serde(default)]
    pub points: i64,

    /// Level name derived from points (cache of `calculate_level`)
    #[serde(default)]
    pub level: String,

    /// Achievement IDs held; grows monotonically
    #[serde(default)]
    pub achievements: BTreeSet<String>,

    /// Total requests completed as a volunteer
    #[serde(default)]
    pub requests_completed: i64,

    /// Completions per request category
    #[serde(default)]
    pub category_stats: HashMap<String, i64>,

    /// Completions within the fast window of the claim
    #[serde(default)]
    pub fast_completions: i64,

    /// Claims made within the early window of request creation
    #[serde(default)]
    pub early_claims: i64,

    /// Consecutive calendar days with at least one completion
    #[serde(default)]
    pub streak_days: i32,

    /// Last calendar day (ISO, UTC) a completion was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_date: Option<String>,

    /// Running average of ratings received
    #[serde(default)]
    pub rating_avg: f64,

    /// Number of ratings received
    #[serde(default)]
    pub rating_count: i64,

    /// Reports filed against this user
    #[serde(default)]
    pub report_count: i64,

    /// Verification flags feeding the trust score
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub phone_verified: bool,
    #[serde(default)]
    pub id_verified: bool,

    /// Soft-ban state
    #[serde(default)]
    pub banned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_expires_at: Option<DateTime>,
}

fn default_trust_score() -> i32 {
    50
}

impl UserDoc {
    /// Create a new user document
    pub fn new(user_id: String, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
            trust_score: default_trust_score(),
            level: "Newcomer".to_string(),
            ..Default::default()
        }
    }

    /// Fold the legacy single-membership shape into the canonical
    /// `communities` map. Documents written before the multi-community
    /// migration carry a bare `community_id` and no map.
    pub fn normalize_legacy(&mut self) {
        if let Some(legacy) = self.community_id.take() {
            self.communities
                .entry(legacy.clone())
                .or_insert(CommunityRole::Member);
            if self.default_community_id.is_none() {
                self.default_community_id = Some(legacy);
            }
        }
    }

    /// Whether a ban is currently in force
    pub fn is_ban_active(&self, now: DateTime) -> bool {
        if !self.banned {
            return false;
        }
        match self.ban_expires_at {
            Some(expires) => now < expires,
            None => true,
        }
    }

    /// Whether the user belongs to the given community
    pub fn is_member_of(&self, community_id: &str) -> bool {
        self.communities.contains_key(community_id)
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on user_id
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            // Sweep queries filter by staleness of the cached score
            (
                doc! { "trust_score_updated_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("trust_score_updated_at_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_legacy_shape() {
        let mut user = UserDoc::new("u1".into(), "Ada".into());
        user.community_id = Some("maple-street".into());

        user.normalize_legacy();

        assert!(user.community_id.is_none());
        assert_eq!(
            user.communities.get("maple-street"),
            Some(&CommunityRole::Member)
        );
        assert_eq!(user.default_community_id.as_deref(), Some("maple-street"));
    }

    #[test]
    fn test_normalize_legacy_does_not_downgrade_admin() {
        let mut user = UserDoc::new("u1".into(), "Ada".into());
        user.communities
            .insert("maple-street".into(), CommunityRole::Admin);
        user.default_community_id = Some("oak-lane".into());
        user.community_id = Some("maple-street".into());

        user.normalize_legacy();

        // Existing map entry wins over the legacy scalar
        assert_eq!(
            user.communities.get("maple-street"),
            Some(&CommunityRole::Admin)
        );
        assert_eq!(user.default_community_id.as_deref(), Some("oak-lane"));
    }

    #[test]
    fn test_ban_expiry() {
        let mut user = UserDoc::new("u1".into(), "Ada".into());
        let now = DateTime::now();
        assert!(!user.is_ban_active(now));

        user.banned = true;
        assert!(user.is_ban_active(now));

        // Expired ban is no longer in force
        user.ban_expires_at = Some(DateTime::from_millis(now.timestamp_millis() - 1000));
        assert!(!user.is_ban_active(now));
    }
}
