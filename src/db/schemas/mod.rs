//! Database schemas for the Commons engine
//!
//! Defines MongoDB document structures for users, communities, join
//! requests, the admin action log, and the read-side request/rating
//! history the reputation engine aggregates over.

mod admin_action;
mod community;
mod help_request;
mod join_request;
mod metadata;
mod rating;
mod user;

pub use admin_action::{AdminAction, AdminActionDoc, ADMIN_ACTION_COLLECTION};
pub use community::{CommunityDoc, COMMUNITY_COLLECTION};
pub use help_request::{HelpRequestDoc, HelpRequestStatus, Urgency, HELP_REQUEST_COLLECTION};
pub use join_request::{
    JoinRequestDoc, JoinRequestStatus, Verification, JOIN_REQUEST_COLLECTION,
};
pub use metadata::Metadata;
pub use rating::{RatingDoc, RATING_COLLECTION};
pub use user::{CommunityRole, UserDoc, USER_COLLECTION};
