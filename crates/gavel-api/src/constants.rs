//! API constants

/// URL prefix for all API routes.
pub const API_PREFIX: &str = "/api/v1";

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Hard cap on list page sizes.
pub const MAX_PAGE_SIZE: i64 = 200;
