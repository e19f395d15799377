//! Seed data for integration tests: organizations, users, events, products,
//! tables, and orders inserted directly through the pool.

use chrono::{Duration, Utc};
use gavel_core::generate_reference_code;
use sqlx::PgPool;
use uuid::Uuid;

pub struct Fixture {
    pub organization_id: Uuid,
    pub event_id: Uuid,
}

/// Organization + active event.
pub async fn seed_org_and_event(pool: &PgPool) -> Fixture {
    let organization_id = Uuid::new_v4();
    let event_id = Uuid::new_v4();
    let suffix = Uuid::new_v4().simple().to_string();

    sqlx::query("INSERT INTO organizations (id, name, slug) VALUES ($1, $2, $3)")
        .bind(organization_id)
        .bind("Harbor Foundation")
        .bind(format!("harbor-{}", suffix))
        .execute(pool)
        .await
        .expect("Failed to insert organization");

    sqlx::query(
        "INSERT INTO events (id, organization_id, name, slug, event_date, is_active)
         VALUES ($1, $2, $3, $4, $5, true)",
    )
    .bind(event_id)
    .bind(organization_id)
    .bind("Spring Gala")
    .bind(format!("spring-gala-{}", suffix))
    .bind(Utc::now() + Duration::days(30))
    .execute(pool)
    .await
    .expect("Failed to insert event");

    Fixture {
        organization_id,
        event_id,
    }
}

pub async fn seed_user(pool: &PgPool, email: &str, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, name, is_super_admin) VALUES ($1, $2, $3, false)")
        .bind(id)
        .bind(email)
        .bind(name)
        .execute(pool)
        .await
        .expect("Failed to insert user");
    id
}

pub async fn seed_org_admin(pool: &PgPool, organization_id: Uuid, user_id: Uuid) {
    sqlx::query("INSERT INTO organization_admins (organization_id, user_id) VALUES ($1, $2)")
        .bind(organization_id)
        .bind(user_id)
        .execute(pool)
        .await
        .expect("Failed to insert organization admin");
}

#[allow(clippy::too_many_arguments)]
pub async fn seed_product(
    pool: &PgPool,
    fixture: &Fixture,
    name: &str,
    kind: &str,
    tier: &str,
    price_cents: i64,
    table_capacity: Option<i32>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO products (id, organization_id, event_id, name, kind, tier, price_cents, table_capacity, is_active)
         VALUES ($1, $2, $3, $4, $5::product_kind, $6::product_tier, $7, $8, true)",
    )
    .bind(id)
    .bind(fixture.organization_id)
    .bind(fixture.event_id)
    .bind(name)
    .bind(kind)
    .bind(tier)
    .bind(price_cents)
    .bind(table_capacity)
    .execute(pool)
    .await
    .expect("Failed to insert product");
    id
}

pub async fn seed_promo_percentage(pool: &PgPool, fixture: &Fixture, code: &str, percent: i64) {
    sqlx::query(
        "INSERT INTO promo_codes (id, organization_id, event_id, code, discount_type, discount_value, is_active, valid_from)
         VALUES ($1, $2, $3, $4, 'percentage', $5, true, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(fixture.organization_id)
    .bind(fixture.event_id)
    .bind(code)
    .bind(percent)
    .bind(Utc::now() - Duration::days(1))
    .execute(pool)
    .await
    .expect("Failed to insert promo code");
}

/// Table owned by `owner_id`, plus the owner's role row when requested.
pub async fn seed_table(
    pool: &PgPool,
    fixture: &Fixture,
    owner_id: Uuid,
    table_type: &str,
    capacity: i32,
) -> Uuid {
    let id = Uuid::new_v4();
    let code = generate_reference_code();
    sqlx::query(
        "INSERT INTO tables (id, organization_id, event_id, name, slug, reference_code, table_type, capacity, status, primary_owner_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7::table_type, $8, 'active', $9)",
    )
    .bind(id)
    .bind(fixture.organization_id)
    .bind(fixture.event_id)
    .bind("Test Table")
    .bind(format!("test-table-{}", code.to_lowercase()))
    .bind(&code)
    .bind(table_type)
    .bind(capacity)
    .bind(owner_id)
    .execute(pool)
    .await
    .expect("Failed to insert table");
    id
}

pub async fn seed_role(pool: &PgPool, table_id: Uuid, user_id: Uuid, role: &str) {
    sqlx::query(
        "INSERT INTO table_user_roles (id, table_id, user_id, role) VALUES ($1, $2, $3, $4::table_role)",
    )
    .bind(Uuid::new_v4())
    .bind(table_id)
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await
    .expect("Failed to insert role");
}

/// COMPLETED order for `quantity` seats at a table.
#[allow(clippy::too_many_arguments)]
pub async fn seed_completed_order(
    pool: &PgPool,
    fixture: &Fixture,
    buyer_id: Uuid,
    product_id: Uuid,
    table_id: Uuid,
    quantity: i32,
    amount_cents: i64,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO orders (id, organization_id, event_id, user_id, product_id, table_id, status, quantity, amount_cents, discount_cents, completed_at)
         VALUES ($1, $2, $3, $4, $5, $6, 'completed', $7, $8, 0, NOW())",
    )
    .bind(id)
    .bind(fixture.organization_id)
    .bind(fixture.event_id)
    .bind(buyer_id)
    .bind(product_id)
    .bind(table_id)
    .bind(quantity)
    .bind(amount_cents)
    .execute(pool)
    .await
    .expect("Failed to insert order");
    id
}

/// Guest assignment consuming one seat of an order.
pub async fn seed_guest(
    pool: &PgPool,
    fixture: &Fixture,
    table_id: Uuid,
    user_id: Uuid,
    order_id: Uuid,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO guest_assignments (id, organization_id, event_id, table_id, user_id, order_id, tier, reference_code, auction_registered)
         VALUES ($1, $2, $3, $4, $5, $6, 'standard', $7, false)",
    )
    .bind(id)
    .bind(fixture.organization_id)
    .bind(fixture.event_id)
    .bind(table_id)
    .bind(user_id)
    .bind(order_id)
    .bind(generate_reference_code())
    .execute(pool)
    .await
    .expect("Failed to insert guest assignment");
    id
}

pub async fn count_guests_at_table(pool: &PgPool, table_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM guest_assignments WHERE table_id = $1")
        .bind(table_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count guests")
}

pub async fn count_tables_for_event(pool: &PgPool, event_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tables WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count tables")
}
