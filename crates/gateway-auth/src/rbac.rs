//! RBAC resolution (C4) - looks up a user's role in a merchant and checks
//! it against the permission matrix in `gateway_types::rbac`.

use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use gateway_db::repos::role_assignment::RoleAssignmentRepo;
use gateway_types::rbac::{Action, Role};

#[derive(Clone)]
pub struct RbacResolver {
    pool: sqlx::PgPool,
}

impl RbacResolver {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    /// Resolves a user's role for a merchant. A missing assignment is a
    /// distinct error from an insufficient one - the caller authenticated
    /// but was never granted access to this merchant.
    pub async fn resolve(&self, user_id: Uuid, merchant_id: Uuid) -> AuthResult<Role> {
        let repo = RoleAssignmentRepo::new(self.pool.clone());
        let assignment = repo
            .find(user_id, merchant_id)
            .await?
            .ok_or(AuthError::NoRoleAssigned)?;

        Role::parse(&assignment.role).ok_or_else(|| {
            AuthError::Internal(format!("unrecognized role '{}' in role_assignments", assignment.role))
        })
    }

    pub fn authorize(&self, role: Role, action: Action) -> AuthResult<()> {
        if role.permits(action) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn authorize_enforces_permission_matrix() {
        let resolver = RbacResolver::new(sqlx::PgPool::connect_lazy("postgres://localhost/test").unwrap());
        assert!(resolver.authorize(Role::Staff, Action::Read).is_ok());
        assert!(resolver.authorize(Role::Staff, Action::Create).is_err());
        assert!(resolver.authorize(Role::Owner, Action::Delete).is_ok());
    }
}
