//! Database repositories for data access layer
//!
//! This crate contains all repository implementations for database
//! operations. Repositories are organized into control/ (organizations,
//! users, events, products, promo codes, audit and webhook ledgers) and
//! seating/ (tables, orders, guest assignments, table roles). Each repository
//! is responsible for a specific domain entity and provides CRUD operations
//! and specialized queries.

pub mod db;

pub use db::control::{
    ActivityLogRepository, EventRepository, OrganizationRepository, ProductRepository,
    PromoCodeRepository, StripeEventRepository, UserRepository,
};
pub use db::seating::{
    GuestAssignmentRepository, OrderRepository, TableRepository, TableRoleRepository,
};
