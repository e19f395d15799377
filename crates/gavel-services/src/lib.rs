//! Gavel Services Layer
//!
//! This crate is the **business service layer**: permission resolution, seat
//! and guest management, checkout, and webhook reconciliation, plus the
//! Stripe client. Keep business logic and coordination here; keep thin HTTP
//! handling in gavel-api.

pub mod checkout;
pub mod fulfillment;
pub mod permissions;
pub mod seating;
pub mod stripe;
pub mod webhook;

pub use checkout::CheckoutService;
pub use fulfillment::{FulfillArgs, FulfillOutcome, OrderFulfillment};
pub use permissions::PermissionService;
pub use seating::SeatingService;
pub use stripe::{
    verify_stripe_signature, CreatePaymentIntentParams, PaymentIntent, PaymentProvider,
    StripeClient,
};
pub use webhook::{StripeWebhookService, WebhookOutcome};
