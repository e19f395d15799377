//! Gavel API
//!
//! Axum HTTP surface over the gavel service layer. Exposed as a library so
//! integration tests can build the router without spawning the binary.

pub mod auth;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
