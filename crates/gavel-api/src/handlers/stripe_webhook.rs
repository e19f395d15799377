use axum::{body::Bytes, extract::State, http::HeaderMap, response::IntoResponse, Json};
use gavel_core::AppError;
use serde_json::json;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::WebhookState;

const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Inbound Stripe webhook endpoint.
///
/// Responds 400 only for an invalid signature or unparseable payload (never
/// logged), non-2xx for ledger write failures (so the provider redelivers),
/// and 200 for everything else - including handler failures, which are
/// recorded on the event ledger row and triaged via the admin surface.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/stripe",
    tag = "webhooks",
    request_body(content = String, description = "Raw Stripe event payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Event received"),
        (status = 400, description = "Invalid signature or payload", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(webhooks, headers, body), fields(operation = "stripe_webhook"))]
pub async fn stripe_webhook(
    State(webhooks): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            HttpAppError(AppError::InvalidInput(
                "Missing Stripe-Signature header".to_string(),
            ))
        })?;

    let outcome = webhooks
        .stripe
        .handle_event(&body, signature)
        .await
        .map_err(HttpAppError)?;

    tracing::info!(outcome = ?outcome, "Handled Stripe webhook delivery");

    Ok(Json(json!({ "received": true })))
}
