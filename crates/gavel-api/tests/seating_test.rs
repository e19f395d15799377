//! Seat claim, removal, and transfer integration tests.
//!
//! Run with: `cargo test -p gavel-api --test seating_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use helpers::fixtures::{
    seed_completed_order, seed_guest, seed_org_and_event, seed_product, seed_role, seed_table,
    seed_user,
};
use helpers::{api_path, setup_test_app};
use serde_json::{json, Value};

#[tokio::test]
async fn test_owner_adds_guest_and_duplicates_conflict() {
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
    let table = seed_table(&app.pool, &fixture, owner, "prepaid", 10).await;
    seed_completed_order(&app.pool, &fixture, owner, product, table, 3, 150_000).await;

    let token = app.token_for(owner, false);

    let response = app
        .client()
        .post(&api_path(&format!("/tables/{}/guests", table)))
        .add_header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "email": "guest@example.com", "name": "Gwen Guest" }))
        .await;
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["table_id"].as_str().unwrap(), table.to_string());
    assert!(body["reference_code"].as_str().unwrap().len() >= 6);

    // Same recipient again: the (table, user) guard rejects it.
    let duplicate = app
        .client()
        .post(&api_path(&format!("/tables/{}/guests", table)))
        .add_header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "email": "guest@example.com" }))
        .await;
    assert_eq!(duplicate.status_code(), 409);
}

#[tokio::test]
async fn test_add_guest_requires_permission() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let owner = seed_user(&app.pool, "owner@example.com", "Olive Owner").await;
    let stranger = seed_user(&app.pool, "stranger@example.com", "Sam Stranger").await;
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
    let table = seed_table(&app.pool, &fixture, owner, "prepaid", 10).await;
    seed_completed_order(&app.pool, &fixture, owner, product, table, 2, 100_000).await;

    let response = app
        .client()
        .post(&api_path(&format!("/tables/{}/guests", table)))
        .add_header("Authorization", format!("Bearer {}", app.token_for(stranger, false)))
        .json(&json!({ "email": "guest@example.com" }))
        .await;

    assert_eq!(response.status_code(), 403);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("access"));
}

#[tokio::test]
async fn test_captain_cannot_remove_self_paying_guest() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let captain = seed_user(&app.pool, "captain@example.com", "Casey Captain").await;
    let guest_user = seed_user(&app.pool, "selfpay@example.com", "Sal Selfpay").await;
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
    let table = seed_table(&app.pool, &fixture, captain, "captain_payg", 10).await;
    seed_role(&app.pool, table, captain, "captain").await;

    // The guest bought their own seat: buyer == assignee.
    let order =
        seed_completed_order(&app.pool, &fixture, guest_user, product, table, 1, 50_000).await;
    let guest = seed_guest(&app.pool, &fixture, table, guest_user, order).await;

    let response = app
        .client()
        .delete(&api_path(&format!("/guests/{}", guest)))
        .add_header("Authorization", format!("Bearer {}", app.token_for(captain, false)))
        .await;
    assert_eq!(response.status_code(), 403);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("self-paying"));

    // The self-paying guest may remove themselves.
    let self_removal = app
        .client()
        .delete(&api_path(&format!("/guests/{}", guest)))
        .add_header(
            "Authorization",
            format!("Bearer {}", app.token_for(guest_user, false)),
        )
        .await;
    assert_eq!(self_removal.status_code(), 204);
}

#[tokio::test]
async fn test_captain_can_remove_comped_guest() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let captain = seed_user(&app.pool, "captain@example.com", "Casey Captain").await;
    let guest_user = seed_user(&app.pool, "comped@example.com", "Corey Comped").await;
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
    let table = seed_table(&app.pool, &fixture, captain, "captain_payg", 10).await;

    // The captain bought the seat the guest sits in.
    let order = seed_completed_order(&app.pool, &fixture, captain, product, table, 2, 100_000).await;
    let guest = seed_guest(&app.pool, &fixture, table, guest_user, order).await;

    let response = app
        .client()
        .delete(&api_path(&format!("/guests/{}", guest)))
        .add_header("Authorization", format!("Bearer {}", app.token_for(captain, false)))
        .await;
    assert_eq!(response.status_code(), 204);
}

#[tokio::test]
async fn test_table_detail_reports_placeholder_seats() {
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
    let table = seed_table(&app.pool, &fixture, owner, "prepaid", 10).await;
    // 3 + 2 purchased seats, 4 assigned -> 1 placeholder.
    let order_a = seed_completed_order(&app.pool, &fixture, owner, product, table, 3, 150_000).await;
    let order_b = seed_completed_order(&app.pool, &fixture, owner, product, table, 2, 100_000).await;
    for (i, order) in [order_a, order_a, order_a, order_b].iter().enumerate() {
        let user = seed_user(&app.pool, &format!("g{}@example.com", i), "Guest").await;
        seed_guest(&app.pool, &fixture, table, user, *order).await;
    }

    let response = app
        .client()
        .get(&api_path(&format!("/tables/{}", table)))
        .add_header("Authorization", format!("Bearer {}", app.token_for(owner, false)))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["seats"]["capacity"], 10);
    assert_eq!(body["seats"]["purchased_seats"], 5);
    assert_eq!(body["seats"]["assigned_seats"], 4);
    assert_eq!(body["seats"]["placeholder_seats"], 1);
    assert_eq!(body["seats"]["unsold_seats"], 5);
}

#[tokio::test]
async fn test_transfer_by_buyer_resets_personal_fields() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let buyer = seed_user(&app.pool, "buyer@example.com", "Bree Buyer").await;
    let holder = seed_user(&app.pool, "holder@example.com", "Hal Holder").await;
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
    let table = seed_table(&app.pool, &fixture, buyer, "prepaid", 10).await;
    let order = seed_completed_order(&app.pool, &fixture, buyer, product, table, 2, 100_000).await;
    let guest = seed_guest(&app.pool, &fixture, table, holder, order).await;

    sqlx::query(
        "UPDATE guest_assignments SET dietary_restrictions = 'vegan', bidder_number = 42, auction_registered = true, checked_in_at = NOW() WHERE id = $1",
    )
    .bind(guest)
    .execute(&app.pool)
    .await
    .unwrap();

    let response = app
        .client()
        .post(&api_path(&format!("/guests/{}/transfer", guest)))
        .add_header("Authorization", format!("Bearer {}", app.token_for(buyer, false)))
        .json(&json!({
            "recipient_email": "newguest@example.com",
            "recipient_name": "Nina New"
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["display_name"], "Nina New");
    assert!(body["dietary_restrictions"].is_null());
    assert!(body["bidder_number"].is_null());
    assert_eq!(body["auction_registered"], false);
    assert!(body["checked_in_at"].is_null());
}

#[tokio::test]
async fn test_transfer_by_unrelated_user_is_forbidden() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let buyer = seed_user(&app.pool, "buyer@example.com", "Bree Buyer").await;
    let holder = seed_user(&app.pool, "holder@example.com", "Hal Holder").await;
    let stranger = seed_user(&app.pool, "stranger@example.com", "Sam Stranger").await;
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
    let table = seed_table(&app.pool, &fixture, buyer, "captain_payg", 10).await;
    let order = seed_completed_order(&app.pool, &fixture, buyer, product, table, 2, 100_000).await;
    let guest = seed_guest(&app.pool, &fixture, table, holder, order).await;

    let response = app
        .client()
        .post(&api_path(&format!("/guests/{}/transfer", guest)))
        .add_header(
            "Authorization",
            format!("Bearer {}", app.token_for(stranger, false)),
        )
        .json(&json!({ "recipient_email": "newguest@example.com" }))
        .await;

    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_concurrent_claims_for_same_user_conflict() {
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
    let table = seed_table(&app.pool, &fixture, owner, "prepaid", 10).await;
    seed_completed_order(&app.pool, &fixture, owner, product, table, 5, 250_000).await;

    let token = app.token_for(owner, false);
    let path = api_path(&format!("/tables/{}/guests", table));
    let body = json!({ "email": "racer@example.com" });

    let (first, second) = tokio::join!(
        app.client()
            .post(&path)
            .add_header("Authorization", format!("Bearer {}", token))
            .json(&body),
        app.client()
            .post(&path)
            .add_header("Authorization", format!("Bearer {}", token))
            .json(&body),
    );

    let mut codes = [first.status_code().as_u16(), second.status_code().as_u16()];
    codes.sort();
    assert_eq!(codes, [201, 409]);

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM guest_assignments WHERE table_id = $1",
    )
    .bind(table)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_guest_self_service_edit() {
    let app = setup_test_app().await;
    let fixture = seed_org_and_event(&app.pool).await;
    let owner = seed_user(&app.pool, "owner@example.com", "Olive Owner").await;
    let guest_user = seed_user(&app.pool, "guest@example.com", "Gwen Guest").await;
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
    let table = seed_table(&app.pool, &fixture, owner, "prepaid", 10).await;
    let order = seed_completed_order(&app.pool, &fixture, owner, product, table, 2, 100_000).await;
    let guest = seed_guest(&app.pool, &fixture, table, guest_user, order).await;

    let response = app
        .client()
        .patch(&api_path(&format!("/guests/{}", guest)))
        .add_header(
            "Authorization",
            format!("Bearer {}", app.token_for(guest_user, false)),
        )
        .json(&json!({ "dietary_restrictions": "gluten-free", "bidder_number": 7 }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["dietary_restrictions"], "gluten-free");
    assert_eq!(body["bidder_number"], 7);
}
