//! Admin action log schema
//!
//! Append-only audit trail. The engine writes entries and never reads
//! them back; a separate reporting surface does.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for admin actions
pub const ADMIN_ACTION_COLLECTION: &str = "admin_actions";

/// Privileged actions recorded in the audit log
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    #[default]
    RoleAssigned,
    RoleRevoked,
    UserBanned,
    UserUnbanned,
    JoinApproved,
    JoinRejected,
    MemberRemoved,
}

/// Admin action log entry; never mutated after insertion
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AdminActionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at doubles as the action timestamp)
    #[serde(default)]
    pub metadata: Metadata,

    /// What was done
    pub action: AdminAction,

    /// Who it was done to
    pub target_user_id: String,

    /// Which admin did it
    pub performed_by: String,

    /// Stated reason, where the action requires one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Community scope, where applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,
}

impl AdminActionDoc {
    /// Create a new log entry
    pub fn new(action: AdminAction, target_user_id: String, performed_by: String) -> Self {
        Self {
            action,
            target_user_id,
            performed_by,
            ..Default::default()
        }
    }

    /// Attach a reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attach a community scope
    pub fn with_community(mut self, community_id: impl Into<String>) -> Self {
        self.community_id = Some(community_id.into());
        self
    }
}

impl IntoIndexes for AdminActionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "target_user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("target_user_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "performed_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("performed_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for AdminActionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
