//! Join request state machine
//!
//! pending -> approved | rejected (terminal), pending -> cancelled
//! (deletes the record). Resolution is linearizable per request: the
//! status flip is a conditional update on `status == "pending"`, so of
//! two concurrent resolutions exactly one wins and the loser sees
//! `AlreadyResolved`. Approval commits the request flip, the user's
//! membership, and the community counter in one transaction.

use bson::{doc, DateTime};
use mongodb::ClientSession;
use tracing::{info, warn};

use crate::db::mongo::is_duplicate_key_error;
use crate::db::schemas::{
    AdminAction, AdminActionDoc, CommunityDoc, CommunityRole, JoinRequestDoc, UserDoc,
    Verification,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{require_reason, EngineError, Result};

/// Governs community admission
#[derive(Clone)]
pub struct JoinRequestService {
    mongo: MongoClient,
    requests: MongoCollection<JoinRequestDoc>,
    users: MongoCollection<UserDoc>,
    communities: MongoCollection<CommunityDoc>,
    audit: MongoCollection<AdminActionDoc>,
}

impl JoinRequestService {
    pub fn new(
        mongo: MongoClient,
        requests: MongoCollection<JoinRequestDoc>,
        users: MongoCollection<UserDoc>,
        communities: MongoCollection<CommunityDoc>,
        audit: MongoCollection<AdminActionDoc>,
    ) -> Self {
        Self {
            mongo,
            requests,
            users,
            communities,
            audit,
        }
    }

    /// Submit a membership application. At most one pending request may
    /// exist per (user, community) pair; the unique partial index makes
    /// the check-then-insert atomic, so a concurrent duplicate loses at
    /// insert time rather than double-passing a read check.
    pub async fn create_join_request(
        &self,
        user_id: &str,
        community_id: &str,
        message: &str,
        verification: Option<Verification>,
    ) -> Result<JoinRequestDoc> {
        let community = self
            .communities
            .find_one(doc! { "community_id": community_id })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("community {}", community_id)))?;
        if !community.active {
            return Err(EngineError::Unauthorized(format!(
                "community {} is not accepting members",
                community_id
            )));
        }

        if let Some(user) = self.users.find_one(doc! { "user_id": user_id }).await? {
            if user.is_ban_active(DateTime::now()) {
                return Err(EngineError::Unauthorized(format!(
                    "user {} is banned",
                    user_id
                )));
            }
        }

        let request = JoinRequestDoc::new(
            user_id.into(),
            community_id.into(),
            message.into(),
            verification,
        );
        let snapshot = request.clone();

        match self.requests.insert_one(request).await {
            Ok(_) => {
                info!(user_id, community_id, request_id = %snapshot.request_id, "join request created");
                Ok(snapshot)
            }
            Err(err) if is_duplicate_key_error(&err) => Err(EngineError::DuplicatePendingRequest(
                format!("user {} already has a pending request to {}", user_id, community_id),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Approve a pending request. All three writes (request flip,
    /// membership insert, member_count increment) commit atomically;
    /// a concurrent resolution of the same request makes the
    /// conditional flip match nothing and the whole transaction aborts
    /// with `AlreadyResolved`.
    pub async fn approve_join_request(&self, request_id: &str, admin_id: &str) -> Result<()> {
        let mut session = self.mongo.start_session().await?;
        session.start_transaction().await?;

        let outcome = self
            .approve_in_session(&mut session, request_id, admin_id)
            .await;

        match outcome {
            Ok(community_id) => {
                session.commit_transaction().await?;
                info!(request_id, admin_id, %community_id, "join request approved");
                Ok(())
            }
            Err(err) => {
                let _ = session.abort_transaction().await;
                Err(err)
            }
        }
    }

    async fn approve_in_session(
        &self,
        session: &mut ClientSession,
        request_id: &str,
        admin_id: &str,
    ) -> Result<String> {
        let now = DateTime::now();

        // Conditional flip: only a still-pending request matches.
        let request = self
            .requests
            .find_one_and_update_session(
                doc! { "request_id": request_id, "status": "pending" },
                doc! { "$set": {
                    "status": "approved",
                    "approved_by": admin_id,
                    "resolved_at": now,
                    "metadata.updated_at": now,
                }},
                session,
            )
            .await?
            .ok_or_else(|| self.resolution_conflict(request_id))?;

        let mut user = self
            .users
            .find_one(doc! { "user_id": &request.user_id })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user {}", request.user_id)))?;
        user.normalize_legacy();

        let role_key = format!("communities.{}", request.community_id);
        let mut user_update = doc! {
            role_key: bson::to_bson(&CommunityRole::Member)?,
            "metadata.updated_at": now,
        };
        if user.default_community_id.is_none() {
            user_update.insert("default_community_id", &request.community_id);
        }
        self.users
            .update_one_session(
                doc! { "user_id": &request.user_id },
                doc! { "$set": user_update },
                session,
            )
            .await?;

        let counter = self
            .communities
            .update_one_session(
                doc! { "community_id": &request.community_id },
                doc! {
                    "$inc": { "member_count": 1 },
                    "$set": { "metadata.updated_at": now },
                },
                session,
            )
            .await?;
        if counter.matched_count == 0 {
            return Err(EngineError::NotFound(format!(
                "community {}",
                request.community_id
            )));
        }

        self.audit
            .insert_one_session(
                AdminActionDoc::new(
                    AdminAction::JoinApproved,
                    request.user_id.clone(),
                    admin_id.into(),
                )
                .with_community(&request.community_id),
                session,
            )
            .await?;

        Ok(request.community_id)
    }

    /// Reject a pending request. A reason is mandatory; rejection is
    /// terminal and the user must submit a new request to retry.
    pub async fn reject_join_request(
        &self,
        request_id: &str,
        admin_id: &str,
        reason: &str,
    ) -> Result<()> {
        require_reason(reason, "rejection")?;

        let now = DateTime::now();
        let request = self
            .requests
            .find_one_and_update(
                doc! { "request_id": request_id, "status": "pending" },
                doc! { "$set": {
                    "status": "rejected",
                    "rejected_by": admin_id,
                    "rejection_reason": reason,
                    "resolved_at": now,
                    "metadata.updated_at": now,
                }},
            )
            .await?
            .ok_or_else(|| self.resolution_conflict(request_id))?;

        self.audit
            .insert_one(
                AdminActionDoc::new(AdminAction::JoinRejected, request.user_id, admin_id.into())
                    .with_reason(reason)
                    .with_community(&request.community_id),
            )
            .await?;

        info!(request_id, admin_id, "join request rejected");
        Ok(())
    }

    /// Cancel a pending request. Only the creator may cancel; the
    /// record is deleted, not tombstoned, and the conditional delete
    /// cannot resurrect an already-resolved request.
    pub async fn cancel_join_request(&self, request_id: &str, user_id: &str) -> Result<()> {
        let request = self
            .requests
            .find_one(doc! { "request_id": request_id })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("join request {}", request_id)))?;

        if request.user_id != user_id {
            return Err(EngineError::Unauthorized(format!(
                "join request {} is not owned by {}",
                request_id, user_id
            )));
        }

        let deleted = self
            .requests
            .delete_one(doc! {
                "request_id": request_id,
                "user_id": user_id,
                "status": "pending",
            })
            .await?;
        if deleted.deleted_count == 0 {
            return Err(EngineError::AlreadyResolved(format!(
                "join request {} was resolved before cancellation",
                request_id
            )));
        }

        info!(request_id, user_id, "join request cancelled");
        Ok(())
    }

    /// Remove an approved member. Decrements `member_count` only when
    /// the user actually held a membership, keeping the counter honest.
    pub async fn remove_member(
        &self,
        admin_id: &str,
        user_id: &str,
        community_id: &str,
    ) -> Result<()> {
        let role_key = format!("communities.{}", community_id);
        let now = DateTime::now();

        let result = self
            .users
            .update_one(
                doc! { "user_id": user_id, &role_key: { "$exists": true } },
                doc! {
                    "$unset": { &role_key: "" },
                    "$set": { "metadata.updated_at": now },
                },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(EngineError::NotFound(format!(
                "user {} is not a member of {}",
                user_id, community_id
            )));
        }

        self.communities
            .update_one(
                doc! { "community_id": community_id },
                doc! {
                    "$inc": { "member_count": -1 },
                    "$set": { "metadata.updated_at": now },
                },
            )
            .await?;

        self.audit
            .insert_one(
                AdminActionDoc::new(AdminAction::MemberRemoved, user_id.into(), admin_id.into())
                    .with_community(community_id),
            )
            .await?;

        info!(user_id, community_id, admin_id, "member removed");
        Ok(())
    }

    /// List pending requests for a community (admin dashboard read)
    pub async fn pending_for_community(&self, community_id: &str) -> Result<Vec<JoinRequestDoc>> {
        self.requests
            .find_many(doc! { "community_id": community_id, "status": "pending" })
            .await
    }

    /// Distinguish "already resolved" from "never existed" when the
    /// conditional update matched nothing.
    fn resolution_conflict(&self, request_id: &str) -> EngineError {
        warn!(request_id, "conditional status flip matched no pending request");
        EngineError::AlreadyResolved(format!(
            "join request {} is not pending (already resolved, cancelled, or unknown)",
            request_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::schemas::{JoinRequestDoc, JoinRequestStatus};

    #[test]
    fn test_only_pending_accepts_transitions() {
        // The conditional filters in approve/reject/cancel all require
        // status == pending; terminal states admit no transition.
        assert!(!JoinRequestStatus::Pending.is_terminal());
        assert!(JoinRequestStatus::Approved.is_terminal());
        assert!(JoinRequestStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_fresh_request_shape() {
        let req = JoinRequestDoc::new("u1".into(), "c1".into(), "hi".into(), None);
        assert_eq!(req.status, JoinRequestStatus::Pending);
        assert!(req.approved_by.is_none());
        assert!(req.rejected_by.is_none());
        assert!(req.rejection_reason.is_none());
    }
}
