//! Shared authentication types.

use gateway_types::rbac::Role;
use uuid::Uuid;

/// The caller context attached to a request once the auth gate succeeds.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub merchant_id: Uuid,
    pub method: AuthMethod,
    /// Resolved role for merchant-scoped RBAC checks. Absent for API-key
    /// callers, which act with the key's own scope rather than a role.
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey { key_id: Uuid },
    Session { user_id: Uuid, session_id: Uuid },
}

impl AuthContext {
    pub fn api_key(merchant_id: Uuid, key_id: Uuid) -> Self {
        Self {
            merchant_id,
            method: AuthMethod::ApiKey { key_id },
            role: None,
        }
    }

    pub fn session(merchant_id: Uuid, user_id: Uuid, session_id: Uuid, role: Role) -> Self {
        Self {
            merchant_id,
            method: AuthMethod::Session { user_id, session_id },
            role: Some(role),
        }
    }
}

/// A freshly minted API key, returned to the caller exactly once.
pub struct IssuedApiKey {
    pub id: Uuid,
    pub plaintext: String,
}

/// A freshly minted session token, returned to the caller exactly once.
pub struct IssuedSession {
    pub id: Uuid,
    pub plaintext: String,
}
