//! Authentication configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub api_key: ApiKeyConfig,
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: ApiKeyConfig::default(),
            session: SessionConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    pub prefix: String,
    pub secret_length: usize,
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            prefix: "pk_".to_string(),
            secret_length: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HMAC signing secret for session tokens. Must be set in production.
    pub signing_secret: String,
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signing_secret: std::env::var("SESSION_SIGNING_SECRET").unwrap_or_default(),
            lifetime: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Two fixed windows per merchant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub per_second_limit: u32,
    pub per_hour_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second_limit: 20,
            per_hour_limit: 10_000,
        }
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.session.signing_secret.is_empty() {
            errors.push("SESSION_SIGNING_SECRET must be set".to_string());
        } else if self.session.signing_secret.len() < 32 {
            errors.push("session signing secret should be at least 32 bytes".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rate_limits_match_two_fixed_windows() {
        let config = RateLimitConfig::default();
        assert_eq!(config.per_second_limit, 20);
        assert_eq!(config.per_hour_limit, 10_000);
    }

    #[test]
    fn validate_rejects_empty_secret() {
        let config = AuthConfig::default();
        assert!(config.validate().is_err());
    }
}
