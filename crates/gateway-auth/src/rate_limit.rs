//! Per-merchant rate limiting (C3) - two independent fixed windows.
//!
//! Both windows are backed by the same Redis counter primitive
//! (`CacheManager::rate_limit_incr`), which sets the window TTL on the
//! counter's first increment. Either window tripping rejects the request.

use std::sync::Arc;

use gateway_db::cache::{keys, CacheManager};

use crate::config::RateLimitConfig;
use crate::error::{AuthError, AuthResult};

#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<CacheManager>,
    config: RateLimitConfig,
}

/// Headers to surface on the response regardless of outcome.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
}

impl RateLimitStatus {
    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
        ]
    }
}

impl RateLimiter {
    pub fn new(cache: Arc<CacheManager>, config: RateLimitConfig) -> Self {
        Self { cache, config }
    }

    /// Increments both windows for `identifier` and rejects if either is
    /// exceeded. `identifier` is a merchant id for authenticated requests
    /// or a client IP for unauthenticated ones.
    pub async fn check(&self, identifier: &str) -> AuthResult<RateLimitStatus> {
        let second_key = keys::rate_limit(identifier, "second");
        let hour_key = keys::rate_limit(identifier, "hour");

        let second_count = self.cache.rate_limit_incr(&second_key, 1).await?;
        let hour_count = self.cache.rate_limit_incr(&hour_key, 60 * 60).await?;

        if second_count > self.config.per_second_limit as i64 {
            return Err(AuthError::RateLimited { retry_after_secs: 1 });
        }
        if hour_count > self.config.per_hour_limit as i64 {
            return Err(AuthError::RateLimited { retry_after_secs: 3600 });
        }

        Ok(RateLimitStatus {
            limit: self.config.per_second_limit,
            remaining: self.config.per_second_limit.saturating_sub(second_count as u32),
        })
    }
}

/// Extracts the caller's IP for unauthenticated rate-limit buckets.
/// Priority: CF-Connecting-IP > X-Real-IP > X-Forwarded-For > socket addr.
pub fn extract_client_ip(headers: &axum::http::HeaderMap, peer_addr: Option<std::net::SocketAddr>) -> String {
    let forwarded_for = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string());

    let real_ip = headers
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string());

    let cf_ip = headers
        .get("CF-Connecting-IP")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string());

    cf_ip
        .or(real_ip)
        .or(forwarded_for)
        .or_else(|| peer_addr.map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_client_ip_precedence() {
        use axum::http::HeaderMap;

        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", "1.2.3.4, 5.6.7.8".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, None), "1.2.3.4");

        headers.insert("X-Real-IP", "10.0.0.1".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, None), "10.0.0.1");

        headers.insert("CF-Connecting-IP", "172.16.0.1".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, None), "172.16.0.1");
    }

    #[test]
    fn extract_client_ip_falls_back_to_socket() {
        let headers = axum::http::HeaderMap::new();
        let addr: std::net::SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert_eq!(extract_client_ip(&headers, Some(addr)), "127.0.0.1");
    }
}
