//! Application state and sub-state extractors.
//!
//! AppState is split into domain sub-states so handlers can extract only what
//! they need via Axum's `FromRef`, and to avoid a single god object with
//! duplicate repositories.

use gavel_core::Config;
use gavel_db::{
    ActivityLogRepository, EventRepository, GuestAssignmentRepository, OrderRepository,
    OrganizationRepository, TableRepository, UserRepository,
};
use gavel_services::{CheckoutService, PermissionService, SeatingService, StripeWebhookService};
use sqlx::PgPool;
use std::sync::Arc;

// ----- Sub-state types -----

/// Database pool and the read-side repositories handlers use directly.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub organizations: OrganizationRepository,
    pub users: UserRepository,
    pub events: EventRepository,
    pub tables: TableRepository,
    pub orders: OrderRepository,
    pub guests: GuestAssignmentRepository,
    pub activity: ActivityLogRepository,
}

impl DbState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            organizations: OrganizationRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            tables: TableRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            guests: GuestAssignmentRepository::new(pool.clone()),
            activity: ActivityLogRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Business services behind the HTTP surface.
#[derive(Clone)]
pub struct ServicesState {
    pub checkout: CheckoutService,
    pub seating: SeatingService,
    pub permissions: PermissionService,
}

/// Webhook reconciliation service.
#[derive(Clone)]
pub struct WebhookState {
    pub stripe: StripeWebhookService,
}

/// Token verification configuration for the auth extractors.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

// ----- AppState -----

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub services: ServicesState,
    pub webhooks: WebhookState,
    pub auth: AuthConfig,
    pub config: Config,
    pub is_production: bool,
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for ServicesState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.services.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for WebhookState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.webhooks.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for AuthConfig {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.auth.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
