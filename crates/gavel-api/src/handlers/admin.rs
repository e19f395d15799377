use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use gavel_core::models::{ActivityLogResponse, StripeEventLogResponse};
use gavel_core::AppError;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::{DbState, ServicesState, WebhookState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Operator triage surface: ledger rows the webhook failed to process.
#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/webhook-events/unprocessed",
    tag = "admin",
    params(
        ("organization_id" = Uuid, Path, description = "Organization ID")
    ),
    responses(
        (status = 200, description = "Unprocessed webhook events", body = [StripeEventLogResponse]),
        (status = 403, description = "Not an organization admin", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(services, webhooks), fields(user_id = %auth.user_id, operation = "list_unprocessed_webhook_events"))]
pub async fn list_unprocessed_webhook_events(
    State(services): State<ServicesState>,
    State(webhooks): State<WebhookState>,
    auth: AuthContext,
    Path(organization_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    services
        .permissions
        .require_org_admin(auth.user_id, organization_id)
        .await
        .map_err(HttpAppError)?;

    let events = webhooks
        .stripe
        .unprocessed_events(clamp_limit(page.limit))
        .await
        .map_err(HttpAppError)?;

    let response: Vec<StripeEventLogResponse> =
        events.into_iter().map(StripeEventLogResponse::from).collect();

    Ok(Json(response))
}

/// Activity feed for an event, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/events/{event_id}/activity",
    tag = "admin",
    params(
        ("event_id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Activity log entries", body = [ActivityLogResponse]),
        (status = 403, description = "Not an organization admin", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(db, services), fields(user_id = %auth.user_id, event_id = %event_id, operation = "list_event_activity"))]
pub async fn list_event_activity(
    State(db): State<DbState>,
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let event = db
        .events
        .get_by_id(event_id)
        .await
        .map_err(HttpAppError)?
        .ok_or_else(|| HttpAppError(AppError::NotFound("Event not found".to_string())))?;

    services
        .permissions
        .require_org_admin(auth.user_id, event.organization_id)
        .await
        .map_err(HttpAppError)?;

    let logs = db
        .activity
        .list_by_event(event_id, clamp_limit(page.limit), page.offset.unwrap_or(0))
        .await
        .map_err(HttpAppError)?;

    let response: Vec<ActivityLogResponse> =
        logs.into_iter().map(ActivityLogResponse::from).collect();

    Ok(Json(response))
}
