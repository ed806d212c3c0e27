//! Store-coupled tests for the join request state machine
//!
//! Covers the writes the unit tests cannot reach: the unique partial
//! index guarding duplicate pending requests, the transactional
//! approval, and the conditional flips that serialize concurrent
//! resolutions. Requires MONGODB_TEST_URI (see tests/common/mod.rs).

mod common;

use bson::doc;
use commons_engine::db::schemas::{CommunityRole, JoinRequestStatus};
use commons_engine::types::EngineError;

#[tokio::test]
async fn test_second_pending_request_is_rejected_at_insert() {
    let Some(h) = common::harness().await else {
        return;
    };
    common::seed_community(&h, "maple-street", 0).await;
    common::seed_user(&h, "alice").await;

    h.join
        .create_join_request("alice", "maple-street", "new to the block", None)
        .await
        .expect("first request");

    let err = h
        .join
        .create_join_request("alice", "maple-street", "sent twice", None)
        .await
        .expect_err("duplicate must lose at insert time");
    assert!(matches!(err, EngineError::DuplicatePendingRequest(_)));

    let pending = h.join.pending_for_community("maple-street").await.unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn test_approval_commits_request_membership_and_counter() {
    let Some(h) = common::harness().await else {
        return;
    };
    common::seed_community(&h, "maple-street", 3).await;
    common::seed_user(&h, "bob").await;

    let request = h
        .join
        .create_join_request("bob", "maple-street", "hi neighbors", None)
        .await
        .unwrap();
    h.join
        .approve_join_request(&request.request_id, "admin-1")
        .await
        .unwrap();

    let request = h
        .requests
        .find_one(doc! { "request_id": &request.request_id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status, JoinRequestStatus::Approved);
    assert_eq!(request.approved_by.as_deref(), Some("admin-1"));

    let user = h
        .users
        .find_one(doc! { "user_id": "bob" })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        user.communities.get("maple-street"),
        Some(&CommunityRole::Member)
    );
    assert_eq!(user.default_community_id.as_deref(), Some("maple-street"));

    let community = h
        .communities
        .find_one(doc! { "community_id": "maple-street" })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(community.member_count, 4);
}

#[tokio::test]
async fn test_concurrent_approvals_resolve_exactly_once() {
    let Some(h) = common::harness().await else {
        return;
    };
    common::seed_community(&h, "maple-street", 3).await;
    common::seed_user(&h, "carol").await;

    let request = h
        .join
        .create_join_request("carol", "maple-street", "hello", None)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        h.join.approve_join_request(&request.request_id, "admin-1"),
        h.join.approve_join_request(&request.request_id, "admin-2"),
    );

    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one approval may win");
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(
        loser.unwrap_err(),
        EngineError::AlreadyResolved(_)
    ));

    // The losing transaction aborted, so the counter moved once.
    let community = h
        .communities
        .find_one(doc! { "community_id": "maple-street" })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(community.member_count, 4);
}

#[tokio::test]
async fn test_rejection_without_reason_mutates_nothing() {
    let Some(h) = common::harness().await else {
        return;
    };
    common::seed_community(&h, "maple-street", 0).await;
    common::seed_user(&h, "dave").await;

    let request = h
        .join
        .create_join_request("dave", "maple-street", "hi", None)
        .await
        .unwrap();

    let err = h
        .join
        .reject_join_request(&request.request_id, "admin-1", "   ")
        .await
        .expect_err("blank reason must be refused");
    assert!(matches!(err, EngineError::MissingReason(_)));

    let request = h
        .requests
        .find_one(doc! { "request_id": &request.request_id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status, JoinRequestStatus::Pending);

    h.join
        .reject_join_request(&request.request_id, "admin-1", "could not verify address")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_is_owner_only_and_deletes_the_record() {
    let Some(h) = common::harness().await else {
        return;
    };
    common::seed_community(&h, "maple-street", 0).await;
    common::seed_user(&h, "erin").await;

    let request = h
        .join
        .create_join_request("erin", "maple-street", "hi", None)
        .await
        .unwrap();

    let err = h
        .join
        .cancel_join_request(&request.request_id, "mallory")
        .await
        .expect_err("only the creator may cancel");
    assert!(matches!(err, EngineError::Unauthorized(_)));

    h.join
        .cancel_join_request(&request.request_id, "erin")
        .await
        .unwrap();
    let gone = h
        .requests
        .find_one(doc! { "request_id": &request.request_id })
        .await
        .unwrap();
    assert!(gone.is_none(), "cancellation deletes, it does not tombstone");

    // With the record gone the pair index no longer blocks a fresh try.
    h.join
        .create_join_request("erin", "maple-street", "second try", None)
        .await
        .unwrap();
}
