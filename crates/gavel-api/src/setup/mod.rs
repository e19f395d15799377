//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from
//! main.rs for better organization and testability.

pub mod database;
pub mod routes;
pub mod server;

use crate::state::{AppState, AuthConfig, DbState, ServicesState, WebhookState};
use anyhow::{Context, Result};
use gavel_core::Config;
use gavel_services::{
    CheckoutService, PermissionService, SeatingService, StripeClient, StripeWebhookService,
};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;

    let provider = Arc::new(StripeClient::new(config.stripe_secret_key.clone()));

    let state = Arc::new(AppState {
        db: DbState::new(pool.clone()),
        services: ServicesState {
            checkout: CheckoutService::new(pool.clone(), provider, config.currency.clone()),
            seating: SeatingService::new(pool.clone()),
            permissions: PermissionService::new(pool.clone()),
        },
        webhooks: WebhookState {
            stripe: StripeWebhookService::new(
                pool,
                config.stripe_webhook_secret.clone(),
                config.stripe_webhook_tolerance_secs,
            ),
        },
        auth: AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
        },
        is_production: config.is_production(),
        config,
    });

    let router = routes::setup_routes(&state.config, state.clone())?;

    Ok((state, router))
}
