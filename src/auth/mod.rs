//! Role and permission authority
//!
//! A static role -> permission table consulted synchronously by every
//! privileged operation, and the service that assigns roles and bans
//! while appending to the admin action log.

pub mod permissions;
pub mod roles;

pub use permissions::{has_permission, permissions_for, Permission, Role};
pub use roles::RoleService;
