//! Stripe integration
//!
//! Outbound payment-intent creation behind the [`PaymentProvider`] trait, and
//! inbound webhook signature verification.

pub mod client;
pub mod signature;

pub use client::{CreatePaymentIntentParams, PaymentIntent, PaymentProvider, StripeClient};
pub use signature::verify_stripe_signature;
