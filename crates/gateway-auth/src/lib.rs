//! Payment gateway authentication layer.
//!
//! Two independent admission paths:
//!
//! - **API key** (`X-API-Key: pk_...`): merchant-to-gateway calls, scoped to
//!   the key's own merchant, no role attached.
//! - **Session token** (`X-Session-Token` or cookie): dashboard/admin flows,
//!   resolved to a merchant role through RBAC.
//!
//! Both paths share a per-merchant rate limiter and feed into the same
//! `AuthContext` so handlers don't need to know which path a caller took.

pub mod api_key;
pub mod config;
pub mod error;
pub mod middleware;
pub mod rate_limit;
pub mod rbac;
pub mod session;
pub mod types;

pub use api_key::ApiKeyService;
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use rate_limit::RateLimiter;
pub use rbac::RbacResolver;
pub use session::SessionService;
pub use types::{AuthContext, AuthMethod, IssuedApiKey, IssuedSession};

use std::sync::Arc;
use uuid::Uuid;

use gateway_db::cache::CacheManager;
use gateway_types::rbac::Role;

/// Combines the admission paths into a single entry point for the API
/// layer's extractors.
#[derive(Clone)]
pub struct AuthService {
    pub api_key: ApiKeyService,
    pub session: SessionService,
    pub rbac: RbacResolver,
    pub rate_limiter: RateLimiter,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(pool: sqlx::PgPool, cache: Arc<CacheManager>, config: AuthConfig) -> Self {
        Self {
            api_key: ApiKeyService::new(pool.clone(), config.api_key.clone()),
            session: SessionService::new(pool.clone(), config.session.clone()),
            rbac: RbacResolver::new(pool),
            rate_limiter: RateLimiter::new(cache, config.rate_limit.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticates a presented API key into a merchant-scoped context.
    pub async fn authenticate_api_key(&self, presented: &str) -> AuthResult<AuthContext> {
        let (merchant_id, key_id) = self.api_key.authenticate(presented).await?;
        Ok(AuthContext::api_key(merchant_id, key_id))
    }

    /// Authenticates a session token and resolves the caller's role for
    /// `merchant_id`.
    pub async fn authenticate_session(&self, presented: &str, merchant_id: Uuid) -> AuthResult<AuthContext> {
        let (user_id, session_id) = self.session.authenticate(presented).await?;
        let role = self.resolve_role(user_id, merchant_id).await?;
        Ok(AuthContext::session(merchant_id, user_id, session_id, role))
    }

    async fn resolve_role(&self, user_id: Uuid, merchant_id: Uuid) -> AuthResult<Role> {
        self.rbac.resolve(user_id, merchant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn auth_service_builds_from_components() {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/test").unwrap();
        let redis = deadpool_redis::Config::from_url("redis://localhost/0")
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .unwrap();
        let cache = Arc::new(CacheManager::new(redis));
        let mut config = AuthConfig::default();
        config.session.signing_secret = "x".repeat(32);

        let service = AuthService::new(pool, cache, config);
        assert_eq!(service.config().rate_limit.per_second_limit, 20);
    }
}
