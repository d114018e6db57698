//! Server configuration.
//!
//! Environment-variable driven, following the same `Default` + env-var
//! override pattern as [`gateway_db::DatabaseConfig`] and
//! [`gateway_auth::AuthConfig`] rather than a separate config-file layer.

use std::net::SocketAddr;
use std::time::Duration;

use gateway_auth::config::AuthConfig;
use gateway_db::DatabaseConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub issuer: IssuerSettings,
    pub webhook: WebhookSettings,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().expect("invalid host/port")
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Issuer RPC endpoint (C6). Empty `base_url` selects [`gateway_adapters::issuer::MockIssuerAdapter`].
#[derive(Debug, Clone)]
pub struct IssuerSettings {
    pub base_url: String,
}

impl Default for IssuerSettings {
    fn default() -> Self {
        Self {
            base_url: std::env::var("ISSUER_BASE_URL").unwrap_or_default(),
        }
    }
}

/// HMAC secret for outbound webhook signing (§4.8). Must be overridden in
/// production; the default is only fit for local runs against the mock
/// issuer/tokenizer.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub signing_secret: String,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            signing_secret: std::env::var("WEBHOOK_SIGNING_SECRET").unwrap_or_else(|_| "dev-webhook-secret".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: std::env::var("METRICS_ENABLED").map(|v| v != "false").unwrap_or(true),
            port: std::env::var("METRICS_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(9090),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            issuer: IssuerSettings::default(),
            webhook: WebhookSettings::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads `.env` if present, then builds from environment variables,
    /// applying CLI overrides on top.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::default()
    }

    /// Checks that a production deployment isn't running on the placeholder
    /// webhook secret or an empty session signing secret.
    pub fn validate(&self, dev_mode: bool) -> Result<(), Vec<String>> {
        let mut errors = self.auth.validate().err().unwrap_or_default();
        if !dev_mode && self.webhook.signing_secret == "dev-webhook-secret" {
            errors.push("WEBHOOK_SIGNING_SECRET must be changed in production".to_string());
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
    fn default_config_binds_to_all_interfaces() {
        let config = ServerConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.socket_addr().port(), 8080);
    }

    #[test]
    fn validate_rejects_placeholder_webhook_secret_outside_dev_mode() {
        let config = ServerConfig {
            auth: AuthConfig {
                session: gateway_auth::config::SessionConfig {
                    signing_secret: "a".repeat(32),
                    ..gateway_auth::config::SessionConfig::default()
                },
                ..AuthConfig::default()
            },
            ..ServerConfig::default()
        };
        assert!(config.validate(false).is_err());
        assert!(config.validate(true).is_ok());
    }
}
