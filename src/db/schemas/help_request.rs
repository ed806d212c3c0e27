//! Help request document schema (read side)
//!
//! Owned by the request CRUD surface, not this engine. The reputation
//! and gamification components read claimed/completed history from it
//! to compute scores; they never write to it.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for help requests
pub const HELP_REQUEST_COLLECTION: &str = "help_requests";

/// Urgency set by the requester; drives the completion point bonus
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Low,
    Medium,
    High,
}

/// Lifecycle state of a help request
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HelpRequestStatus {
    #[default]
    Open,
    Claimed,
    Completed,
    Cancelled,
}

/// Help request document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct HelpRequestDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// External request identifier
    pub request_id: String,

    /// Community the request was posted in
    pub community_id: String,

    /// Category (groceries, transport, yardwork, ...)
    #[serde(default)]
    pub category: String,

    /// Urgency set by the requester
    #[serde(default)]
    pub urgency: Urgency,

    /// Lifecycle state
    #[serde(default)]
    pub status: HelpRequestStatus,

    /// Requester
    pub created_by: String,

    /// Volunteer who claimed it, once claimed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,

    /// When the request was claimed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime>,

    /// When the request was completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
}

impl HelpRequestDoc {
    /// Claim latency in milliseconds, when both timestamps are present
    pub fn claim_latency_ms(&self) -> Option<i64> {
        let claimed = self.claimed_at?;
        let created = self.metadata.created_at?;
        Some(claimed.timestamp_millis() - created.timestamp_millis())
    }

    /// Completion duration in milliseconds, when both timestamps are present
    pub fn completion_duration_ms(&self) -> Option<i64> {
        let completed = self.completed_at?;
        let claimed = self.claimed_at?;
        Some(completed.timestamp_millis() - claimed.timestamp_millis())
    }
}

impl IntoIndexes for HelpRequestDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "claimed_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("claimed_by_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "created_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("created_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for HelpRequestDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
