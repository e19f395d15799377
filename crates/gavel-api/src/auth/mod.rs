//! Authentication
//!
//! Thin JWT bearer verification: an [`AuthContext`](models::AuthContext)
//! extractor for protected routes and an optional variant for guest checkout.
//! Session issuance and refresh live outside this service.

pub mod jwt;
pub mod models;

pub use models::{AuthContext, OptionalAuthContext};
