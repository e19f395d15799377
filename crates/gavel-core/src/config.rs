//! Configuration module
//!
//! Environment-driven configuration for the API server and services:
//! database, auth tokens, Stripe credentials, and HTTP settings.

use std::env;

use anyhow::Context;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;
const STRIPE_WEBHOOK_TOLERANCE_SECS: i64 = 300;
const DEFAULT_CURRENCY: &str = "usd";

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub environment: String,
    // Stripe configuration
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    /// Maximum accepted age of a signed webhook payload, in seconds.
    pub stripe_webhook_tolerance_secs: i64,
    pub currency: String,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase().eq("production") || self.environment.to_lowercase().eq("prod")
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            cors_origins,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| JWT_EXPIRY_HOURS.to_string())
                .parse()
                .unwrap_or(JWT_EXPIRY_HOURS),
            environment,
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            stripe_webhook_tolerance_secs: env::var("STRIPE_WEBHOOK_TOLERANCE_SECS")
                .unwrap_or_else(|_| STRIPE_WEBHOOK_TOLERANCE_SECS.to_string())
                .parse()
                .unwrap_or(STRIPE_WEBHOOK_TOLERANCE_SECS),
            currency: env::var("CURRENCY").unwrap_or_else(|_| DEFAULT_CURRENCY.to_string()),
        })
    }

    /// Fail fast on configuration that would only surface mid-request.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters");
        }
        if self.is_production() {
            if self.stripe_secret_key.is_empty() {
                anyhow::bail!("STRIPE_SECRET_KEY must be set in production");
            }
            if self.stripe_webhook_secret.is_empty() {
                anyhow::bail!("STRIPE_WEBHOOK_SECRET must be set in production");
            }
            if self.cors_origins.iter().any(|o| o == "*") {
                anyhow::bail!("CORS_ORIGINS must not be a wildcard in production");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server_port: 8080,
            cors_origins: vec!["https://gala.example.com".to_string()],
            database_url: "postgresql://localhost/gavel".to_string(),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            jwt_expiry_hours: JWT_EXPIRY_HOURS,
            environment: "development".to_string(),
            stripe_secret_key: "sk_test_123".to_string(),
            stripe_webhook_secret: "whsec_123".to_string(),
            stripe_webhook_tolerance_secs: STRIPE_WEBHOOK_TOLERANCE_SECS,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_dev_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_jwt_secret() {
        let mut config = test_config();
        config.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_production_requires_stripe_credentials() {
        let mut config = test_config();
        config.environment = "production".to_string();
        config.stripe_secret_key = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = test_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
        config.environment = "prod".to_string();
        assert!(config.is_production());
    }
}
