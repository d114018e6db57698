//! Flattened Role/Permission/UserRole join (C4 RBAC).

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbResult, DbRoleAssignment};

pub struct RoleAssignmentRepo {
    pool: PgPool,
}

impl RoleAssignmentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn assign(&self, user_id: Uuid, merchant_id: Uuid, role: &str) -> DbResult<DbRoleAssignment> {
        let assignment = sqlx::query_as::<_, DbRoleAssignment>(
            r#"
            INSERT INTO role_assignments (user_id, merchant_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, merchant_id) DO UPDATE SET role = EXCLUDED.role
            RETURNING id, user_id, merchant_id, role, created_at
            "#,
        )
        .bind(user_id)
        .bind(merchant_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// A user's highest role in a merchant is the single row binding them;
    /// roles are not additive across multiple assignments.
    pub async fn find(&self, user_id: Uuid, merchant_id: Uuid) -> DbResult<Option<DbRoleAssignment>> {
        let assignment = sqlx::query_as::<_, DbRoleAssignment>(
            "SELECT id, user_id, merchant_id, role, created_at FROM role_assignments WHERE user_id = $1 AND merchant_id = $2",
        )
        .bind(user_id)
        .bind(merchant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }
}
