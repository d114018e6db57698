//! Role-based access control vocabulary.
//!
//! Role/Permission/UserRole is flattened into pure enums plus a permission
//! matrix function rather than a cyclic belongs-to graph: a role's
//! permissions are computed, never traversed through lazily loaded fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A merchant-scoped role. `Owner` is implicit for the merchant's creating
/// user and is never assigned through the role-assignment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Manager,
    Staff,
}

impl Role {
    pub fn permits(&self, action: Action) -> bool {
        match self {
            Role::Owner => true,
            Role::Admin => matches!(action, Action::Read | Action::Create | Action::Update),
            Role::Manager => matches!(action, Action::Read | Action::Create),
            Role::Staff => matches!(action, Action::Read),
        }
    }

    /// Parse from the TEXT value stored in `role_assignments.role`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "staff" => Some(Self::Staff),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
        };
        write!(f, "{s}")
    }
}

/// The four actions gated by RBAC. `(resource, action)` pairs are checked
/// against a caller's highest role in the target merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_matrix_matches_spec_table() {
        assert!(Role::Owner.permits(Action::Delete));
        assert!(Role::Admin.permits(Action::Update));
        assert!(!Role::Admin.permits(Action::Delete));
        assert!(Role::Manager.permits(Action::Create));
        assert!(!Role::Manager.permits(Action::Update));
        assert!(Role::Staff.permits(Action::Read));
        assert!(!Role::Staff.permits(Action::Create));
    }

    #[test]
    fn parse_round_trips_display() {
        for role in [Role::Owner, Role::Admin, Role::Manager, Role::Staff] {
            assert_eq!(Role::parse(&role.to_string()), Some(role));
        }
        assert_eq!(Role::parse("superadmin"), None);
    }
}
