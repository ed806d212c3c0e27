//! Community membership
//!
//! The join-request state machine and the member removal path. These
//! are the only writers of `Community.member_count`.

pub mod join_requests;

pub use join_requests::JoinRequestService;
