//! Rating document schema (read side)
//!
//! One star rating left for a user after a completed request. The trust
//! engine averages them; the running average on the user document is
//! maintained by the gamification engine for cheap reads.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for ratings
pub const RATING_COLLECTION: &str = "ratings";

/// Rating document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RatingDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Request the rating concerns
    pub request_id: String,

    /// User being rated (volunteer or requester)
    pub rated_user_id: String,

    /// User who left the rating
    pub rated_by: String,

    /// Stars on a 5-point scale
    pub stars: i32,

    /// Optional free-text comment
    #[serde(default)]
    pub comment: String,
}

impl IntoIndexes for RatingDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "rated_user_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("rated_user_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for RatingDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
