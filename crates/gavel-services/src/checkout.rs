//! Checkout / order engine
//!
//! Validates a purchase request, prices it through `gavel_core::pricing`, and
//! either completes a zero-cost order synchronously or creates a pending
//! order plus a payment intent. The pending-order insert and the provider
//! round-trip are two separately committed steps; no database transaction is
//! ever held across the Stripe call.

use std::sync::Arc;

use gavel_core::models::{
    CheckoutRequest, CheckoutResponse, OrderFlow, PaymentIntentMetadata, Product, ProductKind,
    PromoCode, PromoPreviewRequest, PromoPreviewResponse, TableStatus, User,
};
use gavel_core::{pricing, AppError};
use gavel_db::{
    EventRepository, OrderRepository, ProductRepository, PromoCodeRepository, TableRepository,
    UserRepository,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::fulfillment::{FulfillArgs, OrderFulfillment};
use crate::stripe::{CreatePaymentIntentParams, PaymentProvider};

/// Checkout service
#[derive(Clone)]
pub struct CheckoutService {
    pool: PgPool,
    provider: Arc<dyn PaymentProvider>,
    currency: String,
    users: UserRepository,
    events: EventRepository,
    products: ProductRepository,
    promos: PromoCodeRepository,
    tables: TableRepository,
    orders: OrderRepository,
    fulfillment: OrderFulfillment,
}

/// Validated pricing for a (product, quantity, promo) triple.
struct PricedOrder {
    flow: OrderFlow,
    /// Seat quantity: the request quantity, except full-table purchases where
    /// it becomes the table capacity.
    seat_quantity: i32,
    promo: Option<PromoCode>,
    subtotal_cents: i64,
    discount_cents: i64,
    total_cents: i64,
}

impl CheckoutService {
    pub fn new(pool: PgPool, provider: Arc<dyn PaymentProvider>, currency: String) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            products: ProductRepository::new(pool.clone()),
            promos: PromoCodeRepository::new(pool.clone()),
            tables: TableRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            fulfillment: OrderFulfillment::new(pool.clone()),
            pool,
            provider,
            currency,
        }
    }

    /// Load the product, validate the request against it, and price the
    /// order. Used identically by checkout and the promo preview so the two
    /// can never disagree on amounts.
    async fn validate_and_price(
        &self,
        event_id: Uuid,
        product: &Product,
        quantity: i32,
        table_id: Option<Uuid>,
        promo_code: Option<&str>,
    ) -> Result<PricedOrder, AppError> {
        let event = self
            .events
            .get_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        if !event.is_active {
            return Err(AppError::InvalidInput(
                "Event is not open for checkout".to_string(),
            ));
        }
        if product.event_id != event.id {
            return Err(AppError::InvalidInput(
                "Product does not belong to this event".to_string(),
            ));
        }
        if !product.is_active {
            return Err(AppError::InvalidInput(
                "Product is not available".to_string(),
            ));
        }

        gavel_core::models::validate_quantity(product.kind, quantity)
            .map_err(AppError::InvalidInput)?;

        let (flow, seat_quantity) = match product.kind {
            ProductKind::FullTable => {
                if table_id.is_some() {
                    return Err(AppError::InvalidInput(
                        "Full table purchases create a new table".to_string(),
                    ));
                }
                let capacity = product.table_capacity.ok_or_else(|| {
                    AppError::InvalidInput(
                        "Full table product has no table capacity".to_string(),
                    )
                })?;
                (OrderFlow::FullTable, capacity)
            }
            ProductKind::CaptainCommitment => {
                if table_id.is_some() {
                    return Err(AppError::InvalidInput(
                        "Captain commitments create a new table".to_string(),
                    ));
                }
                (OrderFlow::CaptainCommitment, quantity)
            }
            ProductKind::IndividualTicket => match table_id {
                Some(_) => (OrderFlow::IndividualAtTable, quantity),
                None => (OrderFlow::Individual, quantity),
            },
        };

        if let (OrderFlow::IndividualAtTable, Some(table_id)) = (flow, table_id) {
            let table = self
                .tables
                .get_by_id(table_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Table not found".to_string()))?;
            if table.event_id != event.id {
                return Err(AppError::InvalidInput(
                    "Table does not belong to this event".to_string(),
                ));
            }
            if table.status != TableStatus::Active {
                return Err(AppError::InvalidInput(
                    "Table is not open for new guests".to_string(),
                ));
            }
            // Advisory pre-check; the authoritative check re-runs under the
            // table row lock at completion time.
            let purchased = self.orders.completed_seats(table.id).await?;
            if purchased + seat_quantity as i64 > table.capacity as i64 {
                return Err(AppError::InvalidInput(
                    "Table does not have enough remaining seats".to_string(),
                ));
            }
        }

        let subtotal_cents = pricing::subtotal(product.kind, product.price_cents, seat_quantity);

        let (promo, discount_cents) = match promo_code {
            Some(code) => {
                let promo = self
                    .promos
                    .find_by_code(event.id, code)
                    .await?
                    .ok_or_else(|| AppError::InvalidInput("Invalid promo code".to_string()))?;
                promo
                    .check_redeemable(chrono::Utc::now())
                    .map_err(AppError::InvalidInput)?;
                let discount =
                    pricing::discount_cents(promo.discount_type, promo.discount_value, subtotal_cents);
                (Some(promo), discount)
            }
            None => (None, 0),
        };

        let total_cents = pricing::final_amount_cents(subtotal_cents, discount_cents);

        Ok(PricedOrder {
            flow,
            seat_quantity,
            promo,
            subtotal_cents,
            discount_cents,
            total_cents,
        })
    }

    /// Resolve the buyer: the authenticated session user, or find-or-create
    /// by email for guest checkout.
    async fn resolve_buyer(
        &self,
        session_user_id: Option<Uuid>,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<User, AppError> {
        match session_user_id {
            Some(user_id) => self
                .users
                .get_by_id(user_id)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Session user not found".to_string())),
            None => {
                let email = email.ok_or_else(|| {
                    AppError::InvalidInput("Email is required for guest checkout".to_string())
                })?;
                self.users.find_or_create_by_email(email, name).await
            }
        }
    }

    /// Run a checkout.
    #[tracing::instrument(skip(self, request), fields(event_id = %request.event_id, product_id = %request.product_id, quantity = request.quantity))]
    pub async fn checkout(
        &self,
        session_user_id: Option<Uuid>,
        request: CheckoutRequest,
    ) -> Result<CheckoutResponse, AppError> {
        let buyer = self
            .resolve_buyer(
                session_user_id,
                request.email.as_deref(),
                request.name.as_deref(),
            )
            .await?;

        let product = self
            .products
            .get_by_id(request.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

        let priced = self
            .validate_and_price(
                request.event_id,
                &product,
                request.quantity,
                request.table_id,
                request.promo_code.as_deref(),
            )
            .await?;

        if priced.total_cents == 0 {
            return self.complete_zero_cost(buyer, product, priced, &request).await;
        }

        self.begin_paid_order(buyer, product, priced, &request).await
    }

    /// Zero-cost path: everything commits in one transaction.
    async fn complete_zero_cost(
        &self,
        buyer: User,
        product: Product,
        priced: PricedOrder,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let outcome = self
            .fulfillment
            .fulfill(
                &mut tx,
                FulfillArgs {
                    actor_user_id: Some(buyer.id),
                    buyer,
                    product,
                    quantity: priced.seat_quantity,
                    flow: priced.flow,
                    existing_order: None,
                    table_id: request.table_id,
                    table_name: request.table_name.clone(),
                    promo_code_id: priced.promo.as_ref().map(|p| p.id),
                    amount_cents: priced.total_cents,
                    discount_cents: priced.discount_cents,
                    charge_id: None,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %outcome.order.id, "Completed zero-cost order");

        Ok(CheckoutResponse {
            requires_payment: false,
            order_id: outcome.order.id,
            client_secret: None,
            amount_cents: outcome.order.amount_cents,
            discount_cents: outcome.order.discount_cents,
        })
    }

    /// Paid path: commit a PENDING order, then create the payment intent,
    /// then persist the intent id. A provider failure leaves the pending
    /// order with no intent id, safe to retry or clean up.
    async fn begin_paid_order(
        &self,
        buyer: User,
        product: Product,
        priced: PricedOrder,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, AppError> {
        let order = self
            .orders
            .create_pending(
                product.organization_id,
                product.event_id,
                buyer.id,
                product.id,
                request.table_id,
                priced.promo.as_ref().map(|p| p.id),
                priced.seat_quantity,
                priced.total_cents,
                priced.discount_cents,
            )
            .await?;

        let metadata = PaymentIntentMetadata {
            event_id: product.event_id,
            user_id: buyer.id,
            product_id: product.id,
            quantity: priced.seat_quantity,
            table_id: request.table_id,
            promo_code_id: priced.promo.as_ref().map(|p| p.id),
            order_flow: priced.flow,
            table_name: request.table_name.clone(),
        };

        let intent = self
            .provider
            .create_payment_intent(CreatePaymentIntentParams {
                amount_cents: priced.total_cents,
                currency: self.currency.clone(),
                receipt_email: Some(buyer.email.clone()),
                description: Some(format!("{} x{}", product.name, priced.seat_quantity)),
                metadata: metadata.to_pairs(),
            })
            .await?;

        self.orders.set_payment_intent(order.id, &intent.id).await?;

        tracing::info!(order_id = %order.id, payment_intent = %intent.id, "Created pending order");

        Ok(CheckoutResponse {
            requires_payment: true,
            order_id: order.id,
            client_secret: intent.client_secret,
            amount_cents: priced.total_cents,
            discount_cents: priced.discount_cents,
        })
    }

    /// Dry-run pricing for the public checkout UI. Same validation and
    /// arithmetic as checkout, no rows written.
    pub async fn preview_promo(
        &self,
        request: PromoPreviewRequest,
    ) -> Result<PromoPreviewResponse, AppError> {
        let product = self
            .products
            .get_by_id(request.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

        let priced = self
            .validate_and_price(
                request.event_id,
                &product,
                request.quantity,
                None,
                Some(&request.promo_code),
            )
            .await?;

        Ok(PromoPreviewResponse {
            subtotal_cents: priced.subtotal_cents,
            discount_cents: priced.discount_cents,
            total_cents: priced.total_cents,
        })
    }
}
