//! HTTP handlers
//!
//! Thin request/response wrappers around the service layer. Permission
//! checks happen in the services before any mutation; handlers only shape
//! HTTP concerns.

pub mod admin;
pub mod checkout;
pub mod guests;
pub mod health;
pub mod stripe_webhook;
pub mod tables;
