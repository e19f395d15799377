//! Route configuration and setup

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use gavel_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let api_routes = Router::new()
        // Public checkout surface
        .route("/checkout", post(handlers::checkout::checkout))
        .route(
            "/checkout/promo-preview",
            post(handlers::checkout::promo_preview),
        )
        // Payment provider webhook
        .route(
            "/webhooks/stripe",
            post(handlers::stripe_webhook::stripe_webhook),
        )
        // Tables and seating
        .route("/tables/{id}", get(handlers::tables::get_table))
        .route(
            "/tables/{id}/guests",
            get(handlers::tables::list_guests).post(handlers::tables::add_guest),
        )
        .route("/tables/{id}/roles", post(handlers::tables::add_role))
        .route(
            "/tables/{id}/roles/{user_id}/{role}",
            delete(handlers::tables::remove_role),
        )
        // Guest assignments
        .route(
            "/guests/{id}",
            patch(handlers::guests::edit_guest).delete(handlers::guests::remove_guest),
        )
        .route(
            "/guests/{id}/transfer",
            post(handlers::guests::transfer_ticket),
        )
        .route(
            "/guests/{id}/check-in",
            post(handlers::guests::check_in_guest),
        )
        .route(
            "/organizations/{organization_id}/guests/{reference_code}",
            get(handlers::guests::get_by_reference_code),
        )
        // Admin surfaces
        .route(
            "/organizations/{organization_id}/webhook-events/unprocessed",
            get(handlers::admin::list_unprocessed_webhook_events),
        )
        .route(
            "/events/{event_id}/activity",
            get(handlers::admin::list_event_activity),
        );

    let router = Router::new()
        .route("/health", get(handlers::health::health))
        .nest(API_PREFIX, api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(router)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers(Any)
    };

    Ok(cors)
}
