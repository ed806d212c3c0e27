//! Join request document schema
//!
//! A pending membership application from a user to a community. The
//! unique partial index on (user_id, community_id) over pending
//! documents is what makes the duplicate check atomic: two concurrent
//! submissions cannot both insert.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for join requests
pub const JOIN_REQUEST_COLLECTION: &str = "join_requests";

/// Lifecycle state of a join request. `Approved` and `Rejected` are
/// terminal; cancellation deletes the record instead of tombstoning it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl JoinRequestStatus {
    /// Whether any further transition is permitted
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for JoinRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Optional residency verification payload attached at submission
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Verification {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub zip_code: String,
    /// What was offered as proof (utility bill, lease, ...)
    #[serde(default)]
    pub proof_type: String,
    #[serde(default)]
    pub verified: bool,
}

/// Join request document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct JoinRequestDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// External request identifier
    pub request_id: String,

    /// Applicant
    pub user_id: String,

    /// Community applied to
    pub community_id: String,

    /// Lifecycle state
    #[serde(default)]
    pub status: JoinRequestStatus,

    /// Message from the applicant to the admins
    #[serde(default)]
    pub message: String,

    /// Optional residency verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,

    /// Resolution metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime>,
}

impl JoinRequestDoc {
    /// Create a new pending join request
    pub fn new(
        user_id: String,
        community_id: String,
        message: String,
        verification: Option<Verification>,
    ) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            community_id,
            status: JoinRequestStatus::Pending,
            message,
            verification,
            ..Default::default()
        }
    }
}

impl IntoIndexes for JoinRequestDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "request_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("request_id_unique".to_string())
                        .build(),
                ),
            ),
            // At most one pending request per (user, community) pair.
            // The partial filter keeps resolved requests out of the
            // uniqueness constraint so a rejected user may reapply.
            (
                doc! { "user_id": 1, "community_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! { "status": "pending" })
                        .name("pending_pair_unique".to_string())
                        .build(),
                ),
            ),
            // Admin dashboards list pending requests per community
            (
                doc! { "community_id": 1, "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("community_status_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for JoinRequestDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JoinRequestStatus::Pending.is_terminal());
        assert!(JoinRequestStatus::Approved.is_terminal());
        assert!(JoinRequestStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_new_request_is_pending() {
        let req = JoinRequestDoc::new("u1".into(), "c1".into(), "hi".into(), None);
        assert_eq!(req.status, JoinRequestStatus::Pending);
        assert!(!req.request_id.is_empty());
        assert!(req.resolved_at.is_none());
    }
}
