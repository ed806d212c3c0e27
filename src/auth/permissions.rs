//! Permission levels and the static role -> permission table
//!
//! Roles are flat in code but semantically ordered:
//! super_admin > community_admin > moderator > member. The table is the
//! single authority on who may do what category of thing; it knows
//! nothing about the resources being authorized.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform and community roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
#[derive(Default)]
pub enum Role {
    /// Ordinary community member - no privileged permissions
    #[default]
    Member = 0,
    /// Read/moderate subset within a community
    Moderator = 1,
    /// Full community management, minus platform-wide operations
    CommunityAdmin = 2,
    /// Everything
    SuperAdmin = 3,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => write!(f, "member"),
            Role::Moderator => write!(f, "moderator"),
            Role::CommunityAdmin => write!(f, "community_admin"),
            Role::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "moderator" => Ok(Role::Moderator),
            "community_admin" => Ok(Role::CommunityAdmin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Closed set of privileged operation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ApproveJoinRequests,
    ModerateRequests,
    DeleteRequests,
    FeatureRequests,
    EditBranding,
    EditSettings,
    ViewLogs,
    ManageCommunities,
    AssignRoles,
    BanUsers,
    ExportData,
}

/// All permissions, for the super_admin grant
const ALL_PERMISSIONS: &[Permission] = &[
    Permission::ManageUsers,
    Permission::ApproveJoinRequests,
    Permission::ModerateRequests,
    Permission::DeleteRequests,
    Permission::FeatureRequests,
    Permission::EditBranding,
    Permission::EditSettings,
    Permission::ViewLogs,
    Permission::ManageCommunities,
    Permission::AssignRoles,
    Permission::BanUsers,
    Permission::ExportData,
];

/// Everything except the platform-wide operations
const COMMUNITY_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ManageUsers,
    Permission::ApproveJoinRequests,
    Permission::ModerateRequests,
    Permission::DeleteRequests,
    Permission::FeatureRequests,
    Permission::EditBranding,
    Permission::EditSettings,
    Permission::ViewLogs,
    Permission::BanUsers,
];

/// Read/moderate subset
const MODERATOR_PERMISSIONS: &[Permission] = &[
    Permission::ModerateRequests,
    Permission::ViewLogs,
];

/// Get the permission set for a role
pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::SuperAdmin => ALL_PERMISSIONS,
        Role::CommunityAdmin => COMMUNITY_ADMIN_PERMISSIONS,
        Role::Moderator => MODERATOR_PERMISSIONS,
        Role::Member => &[],
    }
}

/// Check whether a role holds a permission. Pure lookup, total: an
/// unset role holds no permissions rather than erroring.
pub fn has_permission(role: Option<Role>, permission: Permission) -> bool {
    match role {
        Some(role) => permissions_for(role).contains(&permission),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_super_admin_holds_everything() {
        for &perm in ALL_PERMISSIONS {
            assert!(has_permission(Some(Role::SuperAdmin), perm));
        }
    }

    #[test]
    fn test_community_admin_lacks_platform_wide() {
        assert!(has_permission(
            Some(Role::CommunityAdmin),
            Permission::ApproveJoinRequests
        ));
        assert!(has_permission(Some(Role::CommunityAdmin), Permission::BanUsers));
        assert!(!has_permission(
            Some(Role::CommunityAdmin),
            Permission::ManageCommunities
        ));
        assert!(!has_permission(
            Some(Role::CommunityAdmin),
            Permission::AssignRoles
        ));
        assert!(!has_permission(
            Some(Role::CommunityAdmin),
            Permission::ExportData
        ));
    }

    #[test]
    fn test_moderator_subset() {
        assert!(has_permission(Some(Role::Moderator), Permission::ModerateRequests));
        assert!(has_permission(Some(Role::Moderator), Permission::ViewLogs));
        assert!(!has_permission(Some(Role::Moderator), Permission::BanUsers));
        assert!(!has_permission(
            Some(Role::Moderator),
            Permission::ApproveJoinRequests
        ));
    }

    #[test]
    fn test_member_and_unset_hold_nothing() {
        for &perm in ALL_PERMISSIONS {
            assert!(!has_permission(Some(Role::Member), perm));
            assert!(!has_permission(None, perm));
        }
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::SuperAdmin > Role::CommunityAdmin);
        assert!(Role::CommunityAdmin > Role::Moderator);
        assert!(Role::Moderator > Role::Member);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("super_admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert!("czar".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }
}
