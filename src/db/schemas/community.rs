//! Community document schema
//!
//! `member_count` is an incrementing counter maintained by the join
//! request approval and member removal paths, never recomputed by
//! scanning memberships.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for communities
pub const COMMUNITY_COLLECTION: &str = "communities";

/// Community document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CommunityDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// External community identifier
    pub community_id: String,

    /// Display name
    pub name: String,

    /// Inactive communities are excluded from sweeps and new joins
    #[serde(default = "default_true")]
    pub active: bool,

    /// Approved member count
    #[serde(default)]
    pub member_count: i64,
}

fn default_true() -> bool {
    true
}

impl CommunityDoc {
    /// Create a new community document
    pub fn new(community_id: String, name: String) -> Self {
        Self {
            community_id,
            name,
            active: true,
            ..Default::default()
        }
    }
}

impl IntoIndexes for CommunityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "community_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("community_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CommunityDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
