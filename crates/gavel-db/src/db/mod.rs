//! Repository modules
//
// Control repositories (organizations, users, events, products, promo codes,
// audit trail, webhook idempotency ledger)
pub mod control;
//
// Seating repositories (tables, orders, guest assignments, table roles)
pub mod seating;
