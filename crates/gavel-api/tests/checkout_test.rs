//! Checkout flow integration tests.
//!
//! Run with: `cargo test -p gavel-api --test checkout_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use helpers::fixtures::{
    count_guests_at_table, count_tables_for_event, seed_completed_order, seed_org_and_event,
    seed_product, seed_promo_percentage, seed_table, seed_user,
};
use helpers::{api_path, setup_test_app};
use serde_json::{json, Value};

#[tokio::test]
async fn test_zero_cost_captain_commitment_completes_synchronously() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let product = seed_product(
        &app.pool,
        &fixture,
        "Captain Commitment",
        "captain_commitment",
        "standard",
        0,
        Some(10),
    )
    .await;

    let response = app
        .client()
        .post(&api_path("/checkout"))
        .json(&json!({
            "event_id": fixture.event_id,
            "product_id": product,
            "quantity": 1,
            "email": "captain@example.com",
            "name": "Casey Captain",
            "table_name": "Casey's Crew"
        }))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["requires_payment"], false);
    assert!(body["order_id"].is_string());
    assert!(body.get("client_secret").is_none());

    // Synchronous completion created the CAPTAIN_PAYG table and the buyer's
    // own assignment.
    assert_eq!(count_tables_for_event(&app.pool, fixture.event_id).await, 1);
    let (table_id, table_type): (uuid::Uuid, String) =
        sqlx::query_as("SELECT id, table_type::TEXT FROM tables WHERE event_id = $1")
            .bind(fixture.event_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(table_type, "captain_payg");
    assert_eq!(count_guests_at_table(&app.pool, table_id).await, 1);
}

#[tokio::test]
async fn test_full_table_with_promo_requires_payment() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let product = seed_product(
        &app.pool,
        &fixture,
        "Full Table",
        "full_table",
        "vip",
        500_000,
        Some(10),
    )
    .await;
    seed_promo_percentage(&app.pool, &fixture, "GALA10", 10).await;

    let response = app
        .client()
        .post(&api_path("/checkout"))
        .json(&json!({
            "event_id": fixture.event_id,
            "product_id": product,
            "quantity": 1,
            "email": "patron@example.com",
            "promo_code": "GALA10",
            "table_name": "The Patrons"
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["requires_payment"], true);
    assert_eq!(body["amount_cents"], 450_000);
    assert_eq!(body["discount_cents"], 50_000);
    assert!(body["client_secret"].as_str().unwrap().contains("secret"));

    // Asynchronous path: the table is created at webhook time, not now.
    assert_eq!(count_tables_for_event(&app.pool, fixture.event_id).await, 0);

    // The pending order carries the intent id and full seat quantity.
    let (status, quantity, intent): (String, i32, Option<String>) = sqlx::query_as(
        "SELECT status::TEXT, quantity, stripe_payment_intent_id FROM orders WHERE event_id = $1",
    )
    .bind(fixture.event_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(status, "pending");
    assert_eq!(quantity, 10);
    assert!(intent.unwrap().starts_with("pi_test_"));
}

#[tokio::test]
async fn test_full_table_quantity_must_be_one() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let product = seed_product(
        &app.pool,
        &fixture,
        "Full Table",
        "full_table",
        "standard",
        500_000,
        Some(10),
    )
    .await;

    let response = app
        .client()
        .post(&api_path("/checkout"))
        .json(&json!({
            "event_id": fixture.event_id,
            "product_id": product,
            "quantity": 2,
            "email": "patron@example.com"
        }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_join_full_table_is_rejected() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let owner = seed_user(&app.pool, "owner@example.com", "Olive Owner").await;
    let product = seed_product(
        &app.pool,
        &fixture,
        "Individual Ticket",
        "individual_ticket",
        "standard",
        50_000,
        None,
    )
    .await;
    let table = seed_table(&app.pool, &fixture, owner, "captain_payg", 2).await;
    seed_completed_order(&app.pool, &fixture, owner, product, table, 2, 100_000).await;

    // All 2 seats are purchased; a third cannot be bought.
    let response = app
        .client()
        .post(&api_path("/checkout"))
        .json(&json!({
            "event_id": fixture.event_id,
            "product_id": product,
            "quantity": 1,
            "table_id": table,
            "email": "late@example.com"
        }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_promo_preview_prices_without_creating_rows() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let product = seed_product(
        &app.pool,
        &fixture,
        "Individual Ticket",
        "individual_ticket",
        "standard",
        50_000,
        None,
    )
    .await;
    seed_promo_percentage(&app.pool, &fixture, "GALA10", 10).await;

    let response = app
        .client()
        .post(&api_path("/checkout/promo-preview"))
        .json(&json!({
            "event_id": fixture.event_id,
            "product_id": product,
            "quantity": 3,
            "promo_code": "GALA10"
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["subtotal_cents"], 150_000);
    assert_eq!(body["discount_cents"], 15_000);
    assert_eq!(body["total_cents"], 135_000);

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(orders, 0);
}

#[tokio::test]
async fn test_unknown_promo_code_is_rejected() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let product = seed_product(
        &app.pool,
        &fixture,
        "Individual Ticket",
        "individual_ticket",
        "standard",
        50_000,
        None,
    )
    .await;

    let response = app
        .client()
        .post(&api_path("/checkout"))
        .json(&json!({
            "event_id": fixture.event_id,
            "product_id": product,
            "quantity": 1,
            "email": "patron@example.com",
            "promo_code": "NOPE"
        }))
        .await;

    assert_eq!(response.status_code(), 400);
}
