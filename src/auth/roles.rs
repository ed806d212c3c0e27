//! Role assignment, revocation, and bans
//!
//! Every mutation here appends an entry to the admin action log. The
//! log is write-only from this engine's point of view.

use bson::{doc, DateTime};
use std::str::FromStr;
use tracing::info;

use crate::auth::permissions::Role;
use crate::db::schemas::{AdminAction, AdminActionDoc, UserDoc};
use crate::db::MongoCollection;
use crate::types::{require_reason, EngineError, Result};

/// Assigns and revokes roles, manages bans, and writes the audit trail
#[derive(Clone)]
pub struct RoleService {
    users: MongoCollection<UserDoc>,
    audit: MongoCollection<AdminActionDoc>,
}

impl RoleService {
    pub fn new(users: MongoCollection<UserDoc>, audit: MongoCollection<AdminActionDoc>) -> Self {
        Self { users, audit }
    }

    /// Assign a platform role to a user. The role string must parse
    /// into the closed role enum; `community_admin` records which
    /// community the grant is scoped to.
    pub async fn assign_role(
        &self,
        admin_id: &str,
        user_id: &str,
        role: &str,
        community_id: Option<&str>,
    ) -> Result<()> {
        let role = Role::from_str(role).map_err(EngineError::InvalidRole)?;

        let mut update = doc! {
            "role": role.to_string(),
            "metadata.updated_at": DateTime::now(),
        };
        if role == Role::CommunityAdmin {
            if let Some(community) = community_id {
                update.insert("admin_community_id", community);
            }
        }

        let result = self
            .users
            .update_one(doc! { "user_id": user_id }, doc! { "$set": update })
            .await?;
        if result.matched_count == 0 {
            return Err(EngineError::NotFound(format!("user {}", user_id)));
        }

        let mut entry =
            AdminActionDoc::new(AdminAction::RoleAssigned, user_id.into(), admin_id.into())
                .with_reason(format!("role set to {}", role));
        if let Some(community) = community_id {
            entry = entry.with_community(community);
        }
        self.audit.insert_one(entry).await?;

        info!(user_id, %role, admin_id, "role assigned");
        Ok(())
    }

    /// Clear a user's platform role
    pub async fn revoke_role(&self, admin_id: &str, user_id: &str) -> Result<()> {
        let result = self
            .users
            .update_one(
                doc! { "user_id": user_id },
                doc! {
                    "$unset": { "role": "", "admin_community_id": "" },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(EngineError::NotFound(format!("user {}", user_id)));
        }

        self.audit
            .insert_one(AdminActionDoc::new(
                AdminAction::RoleRevoked,
                user_id.into(),
                admin_id.into(),
            ))
            .await?;

        info!(user_id, admin_id, "role revoked");
        Ok(())
    }

    /// Soft-ban a user. A reason is mandatory; an optional duration
    /// sets an expiry after which the ban lapses.
    pub async fn ban_user(
        &self,
        admin_id: &str,
        user_id: &str,
        reason: &str,
        duration: Option<chrono::Duration>,
    ) -> Result<()> {
        require_reason(reason, "ban")?;

        let mut update = doc! {
            "banned": true,
            "ban_reason": reason,
            "banned_by": admin_id,
            "metadata.updated_at": DateTime::now(),
        };
        if let Some(duration) = duration {
            let expires = DateTime::from_millis(
                DateTime::now().timestamp_millis() + duration.num_milliseconds(),
            );
            update.insert("ban_expires_at", expires);
        }

        let result = self
            .users
            .update_one(doc! { "user_id": user_id }, doc! { "$set": update })
            .await?;
        if result.matched_count == 0 {
            return Err(EngineError::NotFound(format!("user {}", user_id)));
        }

        self.audit
            .insert_one(
                AdminActionDoc::new(AdminAction::UserBanned, user_id.into(), admin_id.into())
                    .with_reason(reason),
            )
            .await?;

        info!(user_id, admin_id, reason, "user banned");
        Ok(())
    }

    /// Lift a ban
    pub async fn unban_user(&self, admin_id: &str, user_id: &str) -> Result<()> {
        let result = self
            .users
            .update_one(
                doc! { "user_id": user_id },
                doc! {
                    "$set": { "banned": false, "metadata.updated_at": DateTime::now() },
                    "$unset": { "ban_reason": "", "banned_by": "", "ban_expires_at": "" },
                },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(EngineError::NotFound(format!("user {}", user_id)));
        }

        self.audit
            .insert_one(AdminActionDoc::new(
                AdminAction::UserUnbanned,
                user_id.into(),
                admin_id.into(),
            ))
            .await?;

        info!(user_id, admin_id, "user unbanned");
        Ok(())
    }
}
