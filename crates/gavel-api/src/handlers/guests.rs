use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use gavel_core::models::{
    EditGuestRequest, GuestResponse, TableAction, TransferTicketRequest,
};
use gavel_core::AppError;
use gavel_services::permissions::ensure_allowed;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::{DbState, ServicesState};

#[utoipa::path(
    patch,
    path = "/api/v1/guests/{id}",
    tag = "guests",
    params(("id" = Uuid, Path, description = "Guest assignment ID")),
    request_body = EditGuestRequest,
    responses(
        (status = 200, description = "Guest updated", body = GuestResponse),
        (status = 403, description = "Missing edit_guest permission", body = ErrorResponse),
        (status = 404, description = "Guest assignment not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(services, request), fields(guest_id = %id, user_id = %auth.user_id, operation = "edit_guest"))]
pub async fn edit_guest(
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<EditGuestRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let guest = services
        .seating
        .edit_guest(id, auth.user_id, request)
        .await
        .map_err(HttpAppError)?;

    Ok(Json(GuestResponse::from(guest)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/guests/{id}",
    tag = "guests",
    params(("id" = Uuid, Path, description = "Guest assignment ID")),
    responses(
        (status = 204, description = "Guest removed; the seat becomes a placeholder again"),
        (status = 403, description = "Removal not permitted", body = ErrorResponse),
        (status = 404, description = "Guest assignment not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(services), fields(guest_id = %id, user_id = %auth.user_id, operation = "remove_guest"))]
pub async fn remove_guest(
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    services
        .seating
        .remove_guest(id, auth.user_id)
        .await
        .map_err(HttpAppError)?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/guests/{id}/transfer",
    tag = "guests",
    params(("id" = Uuid, Path, description = "Guest assignment ID")),
    request_body = TransferTicketRequest,
    responses(
        (status = 200, description = "Ticket transferred", body = GuestResponse),
        (status = 403, description = "Transfer not permitted", body = ErrorResponse),
        (status = 404, description = "Guest assignment not found", body = ErrorResponse),
        (status = 409, description = "Recipient already seated at this table", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(services, request), fields(guest_id = %id, user_id = %auth.user_id, operation = "transfer_ticket"))]
pub async fn transfer_ticket(
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<TransferTicketRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let guest = services
        .seating
        .transfer_ticket(id, auth.user_id, request)
        .await
        .map_err(HttpAppError)?;

    Ok(Json(GuestResponse::from(guest)))
}

#[utoipa::path(
    post,
    path = "/api/v1/guests/{id}/check-in",
    tag = "guests",
    params(("id" = Uuid, Path, description = "Guest assignment ID")),
    responses(
        (status = 200, description = "Guest checked in", body = GuestResponse),
        (status = 403, description = "Check-in not permitted", body = ErrorResponse),
        (status = 404, description = "Guest assignment not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(services), fields(guest_id = %id, user_id = %auth.user_id, operation = "check_in_guest"))]
pub async fn check_in_guest(
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let guest = services
        .seating
        .check_in_guest(id, auth.user_id)
        .await
        .map_err(HttpAppError)?;

    Ok(Json(GuestResponse::from(guest)))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/guests/{reference_code}",
    tag = "guests",
    params(
        ("organization_id" = Uuid, Path, description = "Organization ID"),
        ("reference_code" = String, Path, description = "Guest reference code")
    ),
    responses(
        (status = 200, description = "Guest found by reference code", body = GuestResponse),
        (status = 403, description = "No access to the guest's table", body = ErrorResponse),
        (status = 404, description = "No guest with this code", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(db, services), fields(user_id = %auth.user_id, operation = "guest_by_reference_code"))]
pub async fn get_by_reference_code(
    State(db): State<DbState>,
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path((organization_id, reference_code)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let guest = db
        .guests
        .get_by_reference_code(organization_id, &reference_code)
        .await
        .map_err(HttpAppError)?
        .ok_or_else(|| {
            HttpAppError(AppError::NotFound(
                "No guest with this reference code".to_string(),
            ))
        })?;

    // Check-in staff need at least view on the guest's table.
    let decision = services
        .permissions
        .resolve_table_action(auth.user_id, guest.table_id, TableAction::View)
        .await
        .map_err(HttpAppError)?;
    ensure_allowed(decision).map_err(HttpAppError)?;

    Ok(Json(GuestResponse {
        id: guest.id,
        table_id: guest.table_id,
        user_id: guest.user_id,
        order_id: guest.order_id,
        tier: guest.tier,
        display_name: guest.display_name,
        reference_code: guest.reference_code,
        checked_in_at: guest.checked_in_at,
        dietary_restrictions: guest.dietary_restrictions,
        bidder_number: guest.bidder_number,
        auction_registered: guest.auction_registered,
        created_at: guest.created_at,
    }))
}
