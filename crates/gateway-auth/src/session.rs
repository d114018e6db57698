//! Session token admission path (C4).
//!
//! A session token is `<session_id>.<expires_at_unix>.<hex hmac>`, signed
//! with the configured secret. The gate verifies the signature, then checks
//! the session's revocation record - a valid signature alone does not mean
//! the session is still live.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{AuthError, AuthResult};
use crate::types::IssuedSession;
use gateway_db::repos::session::SessionRepo;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct SessionService {
    pool: sqlx::PgPool,
    config: SessionConfig,
}

impl SessionService {
    pub fn new(pool: sqlx::PgPool, config: SessionConfig) -> Self {
        Self { pool, config }
    }

    fn repo(&self) -> SessionRepo {
        SessionRepo::new(self.pool.clone())
    }

    pub async fn issue(&self, user_id: Uuid) -> AuthResult<IssuedSession> {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.config.lifetime).map_err(|e| AuthError::Internal(e.to_string()))?;

        let record = self
            .repo()
            .create(user_id, &placeholder_hash(&nonce), expires_at)
            .await?;

        let plaintext = self.sign(record.id, expires_at)?;
        let token_hash = hash_token(&plaintext);

        // Replace the placeholder hash now that we know the final token.
        sqlx::query("UPDATE sessions SET token_hash = $2 WHERE id = $1")
            .bind(record.id)
            .bind(&token_hash)
            .execute(&self.pool)
            .await
            .map_err(gateway_db::DbError::from)?;

        Ok(IssuedSession {
            id: record.id,
            plaintext,
        })
    }

    /// Verifies signature, expiry, and revocation. Returns the session's
    /// owning user id and session id on success.
    pub async fn authenticate(&self, presented: &str) -> AuthResult<(Uuid, Uuid)> {
        let (session_id, expires_at) = self.verify_signature(presented)?;

        if expires_at < Utc::now() {
            return Err(AuthError::SessionInvalid);
        }

        let token_hash = hash_token(presented);
        let session = self
            .repo()
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or(AuthError::InvalidSessionToken)?;

        if session.id != session_id || !session.is_valid(Utc::now()) {
            return Err(AuthError::SessionInvalid);
        }

        Ok((session.user_id, session.id))
    }

    pub async fn revoke(&self, session_id: Uuid) -> AuthResult<()> {
        self.repo().revoke(session_id).await?;
        Ok(())
    }

    fn sign(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> AuthResult<String> {
        let payload = format!("{session_id}.{}", expires_at.timestamp());
        let mut mac = HmacSha256::new_from_slice(self.config.signing_secret.as_bytes())
            .map_err(|_| AuthError::Internal("invalid signing secret length".to_string()))?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    fn verify_signature(&self, token: &str) -> AuthResult<(Uuid, DateTime<Utc>)> {
        let mut parts = token.splitn(3, '.');
        let session_id = parts.next().and_then(|s| Uuid::parse_str(s).ok()).ok_or(AuthError::InvalidSessionToken)?;
        let expires_unix = parts.next().and_then(|s| s.parse::<i64>().ok()).ok_or(AuthError::InvalidSessionToken)?;
        let signature = parts.next().ok_or(AuthError::InvalidSessionToken)?;

        let payload = format!("{session_id}.{expires_unix}");
        let mut mac = HmacSha256::new_from_slice(self.config.signing_secret.as_bytes())
            .map_err(|_| AuthError::Internal("invalid signing secret length".to_string()))?;
        mac.update(payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return Err(AuthError::InvalidSessionToken);
        }

        let expires_at = DateTime::from_timestamp(expires_unix, 0).ok_or(AuthError::InvalidSessionToken)?;
        Ok((session_id, expires_at))
    }
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Unique placeholder stored before the real token (which embeds the row's
/// own id) can be computed.
fn placeholder_hash(nonce: &[u8]) -> String {
    hex::encode(Sha256::digest(nonce))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            signing_secret: "a".repeat(32),
            lifetime: std::time::Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn signature_round_trips() {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/test").unwrap();
        let service = SessionService::new(pool, config());
        let id = Uuid::new_v4();
        let expires_at = Utc::now() + chrono::Duration::hours(1);
        let token = service.sign(id, expires_at).unwrap();
        let (parsed_id, parsed_exp) = service.verify_signature(&token).unwrap();
        assert_eq!(parsed_id, id);
        assert_eq!(parsed_exp.timestamp(), expires_at.timestamp());
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/test").unwrap();
        let service = SessionService::new(pool, config());
        let token = service.sign(Uuid::new_v4(), Utc::now() + chrono::Duration::hours(1)).unwrap();
        let mut tampered = token.clone();
        tampered.push('0');
        assert!(service.verify_signature(&tampered).is_err());
    }
}
