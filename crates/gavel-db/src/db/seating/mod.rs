pub mod guest;
pub mod order;
pub mod role;
pub mod table;

pub use guest::GuestAssignmentRepository;
pub use order::OrderRepository;
pub use role::TableRoleRepository;
pub use table::TableRepository;

/// Name of the violated constraint, when the error is a database uniqueness
/// violation. Used to tell reference-code collisions (retryable) apart from
/// business-level conflicts like a duplicate (table, user) assignment.
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint().map(|c| c.to_string()),
        _ => None,
    }
}
