use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use gavel_core::models::{CheckoutRequest, CheckoutResponse, PromoPreviewRequest, PromoPreviewResponse};

use crate::auth::OptionalAuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::ServicesState;

#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    tag = "checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order created or completed", body = CheckoutResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Event, product, or table not found", body = ErrorResponse),
        (status = 502, description = "Payment provider failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(services, request),
    fields(
        event_id = %request.event_id,
        product_id = %request.product_id,
        operation = "checkout"
    )
)]
pub async fn checkout(
    State(services): State<ServicesState>,
    auth: OptionalAuthContext,
    ValidatedJson(request): ValidatedJson<CheckoutRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let session_user_id = auth.0.map(|ctx| ctx.user_id);

    let response = services
        .checkout
        .checkout(session_user_id, request)
        .await
        .map_err(HttpAppError)?;

    let status = if response.requires_payment {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/promo-preview",
    tag = "checkout",
    request_body = PromoPreviewRequest,
    responses(
        (status = 200, description = "Priced preview", body = PromoPreviewResponse),
        (status = 400, description = "Invalid request or promo code", body = ErrorResponse),
        (status = 404, description = "Event or product not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(services, request), fields(operation = "promo_preview"))]
pub async fn promo_preview(
    State(services): State<ServicesState>,
    ValidatedJson(request): ValidatedJson<PromoPreviewRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = services
        .checkout
        .preview_promo(request)
        .await
        .map_err(HttpAppError)?;

    Ok(Json(response))
}
