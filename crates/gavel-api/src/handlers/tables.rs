use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use gavel_core::models::{
    AddGuestRequest, AddRoleRequest, GuestResponse, TableAction, TableResponse, TableRole,
};
use gavel_core::AppError;
use gavel_services::permissions::ensure_allowed;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::{DbState, ServicesState};

/// Roster entry: assignment plus the guest's identity.
#[derive(Debug, Serialize, ToSchema)]
pub struct TableGuestResponse {
    #[serde(flatten)]
    pub guest: GuestResponse,
    pub email: String,
    pub user_name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/tables/{id}",
    tag = "tables",
    params(("id" = Uuid, Path, description = "Table ID")),
    responses(
        (status = 200, description = "Table detail with seat summary", body = TableResponse),
        (status = 403, description = "No access to this table", body = ErrorResponse),
        (status = 404, description = "Table not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(db, services), fields(table_id = %id, user_id = %auth.user_id, operation = "get_table"))]
pub async fn get_table(
    State(db): State<DbState>,
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let decision = services
        .permissions
        .resolve_table_action(auth.user_id, id, TableAction::View)
        .await
        .map_err(HttpAppError)?;
    ensure_allowed(decision).map_err(HttpAppError)?;

    let table = db
        .tables
        .get_by_id(id)
        .await
        .map_err(HttpAppError)?
        .ok_or_else(|| HttpAppError(AppError::NotFound("Table not found".to_string())))?;

    let seats = services
        .seating
        .seat_summary(&table)
        .await
        .map_err(HttpAppError)?;

    Ok(Json(TableResponse {
        id: table.id,
        event_id: table.event_id,
        name: table.name,
        slug: table.slug,
        reference_code: table.reference_code,
        table_type: table.table_type,
        status: table.status,
        seats,
        created_at: table.created_at,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/tables/{id}/guests",
    tag = "tables",
    params(("id" = Uuid, Path, description = "Table ID")),
    responses(
        (status = 200, description = "Guest roster", body = [TableGuestResponse]),
        (status = 403, description = "No access to this table", body = ErrorResponse),
        (status = 404, description = "Table not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(services), fields(table_id = %id, user_id = %auth.user_id, operation = "list_table_guests"))]
pub async fn list_guests(
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let guests = services
        .seating
        .list_guests(id, auth.user_id)
        .await
        .map_err(HttpAppError)?;

    let roster: Vec<TableGuestResponse> = guests
        .into_iter()
        .map(|g| TableGuestResponse {
            email: g.email.clone(),
            user_name: g.user_name.clone(),
            guest: GuestResponse {
                id: g.id,
                table_id: g.table_id,
                user_id: g.user_id,
                order_id: g.order_id,
                tier: g.tier,
                display_name: g.display_name,
                reference_code: g.reference_code,
                checked_in_at: g.checked_in_at,
                dietary_restrictions: g.dietary_restrictions,
                bidder_number: g.bidder_number,
                auction_registered: g.auction_registered,
                created_at: g.created_at,
            },
        })
        .collect();

    Ok(Json(roster))
}

#[utoipa::path(
    post,
    path = "/api/v1/tables/{id}/guests",
    tag = "tables",
    params(("id" = Uuid, Path, description = "Table ID")),
    request_body = AddGuestRequest,
    responses(
        (status = 201, description = "Guest assigned", body = GuestResponse),
        (status = 403, description = "Missing add_guest permission", body = ErrorResponse),
        (status = 404, description = "Table not found", body = ErrorResponse),
        (status = 409, description = "Duplicate assignment or no free seats", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(services, request), fields(table_id = %id, user_id = %auth.user_id, operation = "add_guest"))]
pub async fn add_guest(
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<AddGuestRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let guest = services
        .seating
        .add_guest(id, auth.user_id, request)
        .await
        .map_err(HttpAppError)?;

    Ok((StatusCode::CREATED, Json(GuestResponse::from(guest))))
}

#[utoipa::path(
    post,
    path = "/api/v1/tables/{id}/roles",
    tag = "tables",
    params(("id" = Uuid, Path, description = "Table ID")),
    request_body = AddRoleRequest,
    responses(
        (status = 204, description = "Role granted"),
        (status = 403, description = "Missing manage_roles permission", body = ErrorResponse),
        (status = 404, description = "Table not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(services, request), fields(table_id = %id, user_id = %auth.user_id, operation = "add_role"))]
pub async fn add_role(
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<AddRoleRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    services
        .seating
        .add_role(id, auth.user_id, request)
        .await
        .map_err(HttpAppError)?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v1/tables/{id}/roles/{user_id}/{role}",
    tag = "tables",
    params(
        ("id" = Uuid, Path, description = "Table ID"),
        ("user_id" = Uuid, Path, description = "User whose role is revoked"),
        ("role" = TableRole, Path, description = "Role to revoke")
    ),
    responses(
        (status = 204, description = "Role revoked"),
        (status = 403, description = "Missing manage_roles permission", body = ErrorResponse),
        (status = 404, description = "Table or role not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(services), fields(table_id = %id, user_id = %auth.user_id, operation = "remove_role"))]
pub async fn remove_role(
    State(services): State<ServicesState>,
    auth: AuthContext,
    Path((id, user_id, role)): Path<(Uuid, Uuid, TableRole)>,
) -> Result<impl IntoResponse, HttpAppError> {
    services
        .seating
        .remove_role(id, auth.user_id, user_id, role)
        .await
        .map_err(HttpAppError)?;

    Ok(StatusCode::NO_CONTENT)
}
