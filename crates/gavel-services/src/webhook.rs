//! Webhook reconciliation engine
//!
//! Consumes the payment provider's event stream and reconciles it into
//! completed orders, tables, and the buyer's guest assignment, exactly once
//! per event id.
//!
//! Per-event state machine: unseen -> logged(unprocessed) -> processed
//! (terminal), with logged-with-error as the retryable non-terminal state.
//! The ledger row is written before dispatch so a crash mid-processing leaves
//! a visible unprocessed record. Handler failures are persisted on the row
//! and converted to an Ok outcome so the provider stops redelivering a
//! permanently-failing payload; the row stays unprocessed for operator
//! triage.

use std::collections::HashMap;

use chrono::Utc;
use gavel_core::models::{ActivityAction, OrderStatus, PaymentIntentMetadata};
use gavel_core::AppError;
use gavel_db::{
    ActivityLogRepository, OrderRepository, ProductRepository, StripeEventRepository,
    UserRepository,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::fulfillment::{FulfillArgs, OrderFulfillment};
use crate::stripe::verify_stripe_signature;

const EVENT_PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
const EVENT_PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// What handling a delivery amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Handled and marked processed.
    Processed,
    /// Event id already processed; delivery was a no-op.
    Duplicate,
    /// Event type this service does not consume.
    Ignored,
    /// Handler failed; error recorded on the ledger row, row left
    /// unprocessed.
    Failed,
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripePaymentIntentObject,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntentObject {
    id: String,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    latest_charge: Option<String>,
    #[serde(default)]
    last_payment_error: Option<StripeLastPaymentError>,
}

#[derive(Debug, Deserialize)]
struct StripeLastPaymentError {
    #[serde(default)]
    message: Option<String>,
}

/// Stripe webhook reconciliation service
#[derive(Clone)]
pub struct StripeWebhookService {
    pool: PgPool,
    webhook_secret: String,
    tolerance_secs: i64,
    events: StripeEventRepository,
    orders: OrderRepository,
    products: ProductRepository,
    users: UserRepository,
    activity: ActivityLogRepository,
    fulfillment: OrderFulfillment,
}

impl StripeWebhookService {
    pub fn new(pool: PgPool, webhook_secret: String, tolerance_secs: i64) -> Self {
        Self {
            events: StripeEventRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            products: ProductRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            activity: ActivityLogRepository::new(pool.clone()),
            fulfillment: OrderFulfillment::new(pool.clone()),
            pool,
            webhook_secret,
            tolerance_secs,
        }
    }

    /// Handle one delivery.
    ///
    /// Errors returned from here become non-2xx responses: invalid signature
    /// or malformed payload (reject, unlogged) and ledger write failures
    /// (the provider should redeliver). Business-logic failures do NOT
    /// propagate; they are recorded on the ledger row and reported as
    /// [`WebhookOutcome::Failed`].
    #[tracing::instrument(skip(self, payload, signature_header))]
    pub async fn handle_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome, AppError> {
        verify_stripe_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            self.tolerance_secs,
            Utc::now().timestamp(),
        )?;

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::InvalidInput(format!("Malformed webhook payload: {}", e)))?;
        let payload_json: serde_json::Value = serde_json::from_slice(payload)?;

        // Upsert the ledger row before dispatch. At-least-once delivery
        // dedupes here: a row already marked processed means completed work.
        let log = self
            .events
            .log_event(&event.id, &event.event_type, &payload_json)
            .await?;
        if log.processed {
            tracing::info!(provider_event_id = %event.id, "Duplicate webhook event, skipping");
            return Ok(WebhookOutcome::Duplicate);
        }

        let result = match event.event_type.as_str() {
            EVENT_PAYMENT_SUCCEEDED => self.handle_payment_succeeded(&event.data.object).await,
            EVENT_PAYMENT_FAILED => self.handle_payment_failed(&event.data.object).await,
            other => {
                tracing::debug!(event_type = other, "Ignoring unhandled webhook event type");
                self.events.mark_processed(log.id).await?;
                return Ok(WebhookOutcome::Ignored);
            }
        };

        match result {
            Ok(()) => {
                self.events.mark_processed(log.id).await?;
                Ok(WebhookOutcome::Processed)
            }
            Err(err) => {
                tracing::error!(
                    provider_event_id = %event.id,
                    error = %err.detailed_message(),
                    "Webhook handler failed; leaving event unprocessed"
                );
                self.events
                    .record_error(log.id, &err.detailed_message())
                    .await?;
                Ok(WebhookOutcome::Failed)
            }
        }
    }

    /// Reconcile a successful payment into a COMPLETED order, its table (for
    /// full-table flows), and the buyer's guest assignment, in one
    /// transaction.
    async fn handle_payment_succeeded(
        &self,
        intent: &StripePaymentIntentObject,
    ) -> Result<(), AppError> {
        // Metadata is validated strictly even though this server wrote it.
        let metadata = PaymentIntentMetadata::from_pairs(&intent.metadata)?;

        let buyer = self
            .users
            .get_by_id(metadata.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Buyer from payment metadata not found".to_string()))?;
        let product = self
            .products
            .get_by_id(metadata.product_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Product from payment metadata not found".to_string())
            })?;

        let mut tx = self.pool.begin().await?;

        let existing_order = self
            .orders
            .get_by_payment_intent_tx(&mut tx, &intent.id)
            .await?;

        // Belt and braces next to the ledger check: duplicate deliveries that
        // race past it still no-op on the completed order.
        if let Some(ref order) = existing_order {
            if order.status == OrderStatus::Completed {
                tx.rollback().await?;
                tracing::info!(order_id = %order.id, "Order already completed, skipping");
                return Ok(());
            }
        }

        let (amount_cents, discount_cents) = match existing_order {
            Some(ref order) => (order.amount_cents, order.discount_cents),
            None => (intent.amount, 0),
        };

        let outcome = self
            .fulfillment
            .fulfill(
                &mut tx,
                FulfillArgs {
                    buyer,
                    product,
                    quantity: metadata.quantity,
                    flow: metadata.order_flow,
                    existing_order,
                    table_id: metadata.table_id,
                    table_name: metadata.table_name.clone(),
                    promo_code_id: metadata.promo_code_id,
                    amount_cents,
                    discount_cents,
                    charge_id: intent.latest_charge.clone(),
                    actor_user_id: None,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %outcome.order.id,
            table_id = ?outcome.table.as_ref().map(|t| t.id),
            created_table = outcome.created_table,
            "Reconciled successful payment"
        );

        Ok(())
    }

    /// Annotate a failed payment on the pending order. The order stays
    /// PENDING so the buyer can retry; this policy is applied uniformly.
    async fn handle_payment_failed(
        &self,
        intent: &StripePaymentIntentObject,
    ) -> Result<(), AppError> {
        let reason = intent
            .last_payment_error
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| "Payment failed".to_string());

        match self.orders.annotate_failure(&intent.id, &reason).await? {
            Some(order) => {
                self.activity
                    .record(
                        order.organization_id,
                        Some(order.event_id),
                        None,
                        ActivityAction::PaymentFailed,
                        "order",
                        order.id,
                        json!({
                            "payment_intent_id": intent.id,
                            "reason": reason,
                        }),
                    )
                    .await?;
            }
            None => {
                tracing::warn!(
                    payment_intent = %intent.id,
                    "Payment failure for unknown or non-pending order"
                );
            }
        }

        Ok(())
    }

    /// Unprocessed ledger rows for the operator triage surface.
    pub async fn unprocessed_events(
        &self,
        limit: i64,
    ) -> Result<Vec<gavel_core::models::StripeEventLog>, AppError> {
        self.events.list_unprocessed(limit).await
    }
}
