//! Tests for API error handling.
//!
//! These tests verify status codes and the `{error, code, timestamp}`
//! body for invalid input, missing resources and failing dependencies.

use axum::http::StatusCode;
use catalog_core::{Brand, Page};
use integration_tests::{fixtures, setup::TestContext};

fn assert_error(response: &axum_test::TestResponse, status: StatusCode, code: &str) {
    response.assert_status(status);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], code, "unexpected body: {}", body);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(body["timestamp"].as_i64().is_some_and(|t| t > 0));
}

/// Unknown vehicle type filter
#[tokio::test]
async fn test_invalid_vehicle_type_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .get("/brands")
        .add_query_param("vehicleType", "barcos")
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALID_001");
}

/// Non-numeric paging parameters
#[tokio::test]
async fn test_invalid_page_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/brands").add_query_param("page", "first").await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALID_001");
}

/// A blank vehicle type means no filter, and page size is capped.
#[tokio::test]
async fn test_blank_filter_and_oversized_page_are_accepted() {
    let ctx = TestContext::with_upstream(fixtures::small_catalog());
    let server = ctx.server();
    server.post("/initial-load").await.assert_status(StatusCode::ACCEPTED);
    ctx.drain_queue().await;

    let response = server
        .get("/brands")
        .add_query_param("vehicleType", "")
        .add_query_param("size", "500")
        .await;
    response.assert_status_ok();
    let page: Page<Brand> = response.json();
    assert_eq!(page.size, 100);
    assert_eq!(page.total, 4);

    let response = server
        .get("/brands")
        .add_query_param("page", "1")
        .add_query_param("size", "3")
        .await;
    let page: Page<Brand> = response.json();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages, 2);
}

/// Missing brands and models
#[tokio::test]
async fn test_unknown_resources_return_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    assert_error(&server.get("/brands/404").await, StatusCode::NOT_FOUND, "NOT_FOUND");
    assert_error(
        &server.get("/brands/404/models").await,
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
    );
    assert_error(&server.get("/models/404").await, StatusCode::NOT_FOUND, "NOT_FOUND");

    let response = server
        .put("/models/404")
        .json(&fixtures::model_update_body(Some("Novo"), None))
        .await;
    assert_error(&response, StatusCode::NOT_FOUND, "NOT_FOUND");
}

/// Registering the same brand code twice
#[tokio::test]
async fn test_duplicate_brand_returns_409() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server
        .post("/brands")
        .json(&fixtures::create_brand_body("21", "Fiat", "carros"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/brands")
        .json(&fixtures::create_brand_body("21", "Fiat Novo", "motos"))
        .await;
    assert_error(&response, StatusCode::CONFLICT, "CONFLICT");

    // Only the first registration was queued
    assert_eq!(ctx.broker.pending(), 1);
    assert_eq!(ctx.store.brand_count(), 1);
}

/// Field validation on brand registration
#[tokio::test]
async fn test_invalid_brand_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for body in [
        fixtures::create_brand_body("", "Fiat", "carros"),
        fixtures::create_brand_body("21", "   ", "carros"),
        fixtures::create_brand_body("21", "Fiat", "barcos"),
    ] {
        let response = server.post("/brands").json(&body).await;
        assert_error(&response, StatusCode::BAD_REQUEST, "VALID_001");
    }

    assert_eq!(ctx.store.brand_count(), 0);
    assert_eq!(ctx.broker.pending(), 0);
}

/// Values longer than the catalog columns are rejected before storage.
#[tokio::test]
async fn test_oversized_fields_return_400() {
    let ctx = TestContext::with_upstream(fixtures::small_catalog());
    let server = ctx.server();

    let long_code = "9".repeat(33);
    let long_name = "x".repeat(256);
    for body in [
        fixtures::create_brand_body(&long_code, "Fiat", "carros"),
        fixtures::create_brand_body("21", &long_name, "carros"),
    ] {
        let response = server.post("/brands").json(&body).await;
        assert_error(&response, StatusCode::BAD_REQUEST, "VALID_001");
    }
    assert_eq!(ctx.store.brand_count(), 0);
    assert_eq!(ctx.broker.pending(), 0);

    server.post("/initial-load").await.assert_status(StatusCode::ACCEPTED);
    ctx.drain_queue().await;

    let response = server
        .put("/models/2101")
        .json(&fixtures::model_update_body(Some(&long_name), None))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALID_001");

    let model: serde_json::Value = server.get("/models/2101").await.json();
    assert_eq!(model["nome"], "Uno Mille");
}

/// Unparseable request bodies
#[tokio::test]
async fn test_malformed_json_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/brands")
        .content_type("application/json")
        .bytes("{\"codigo\": \"21\", ".into())
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALID_002");

    let response = server
        .put("/models/1")
        .content_type("application/json")
        .bytes("not json".into())
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALID_002");
}

/// Broker rejecting publishes during an initial load
#[tokio::test]
async fn test_queue_failure_returns_503() {
    let ctx = TestContext::with_upstream(fixtures::small_catalog());
    let server = ctx.server();
    ctx.set_publish_failure(true);

    let response = server.post("/initial-load").await;
    assert_error(&response, StatusCode::SERVICE_UNAVAILABLE, "QUEUE_001");
    let body: serde_json::Value = response.json();
    assert_eq!(body["details"].as_array().map(Vec::len), Some(3));
    assert_eq!(ctx.broker.pending(), 0);
}

/// A registered brand survives a failed publish.
#[tokio::test]
async fn test_create_brand_queue_failure_keeps_row() {
    let ctx = TestContext::new();
    let server = ctx.server();
    ctx.set_publish_failure(true);

    let response = server
        .post("/brands")
        .json(&fixtures::create_brand_body("21", "Fiat", "carros"))
        .await;
    assert_error(&response, StatusCode::SERVICE_UNAVAILABLE, "QUEUE_001");

    server.get("/brands/21").await.assert_status_ok();
}

/// FIPE API down during an initial load
#[tokio::test]
async fn test_upstream_failure_returns_502() {
    let ctx = TestContext::with_upstream(fixtures::small_catalog());
    let server = ctx.server();
    ctx.upstream.set_should_fail(true);

    let response = server.post("/initial-load").await;
    assert_error(&response, StatusCode::BAD_GATEWAY, "UPSTREAM_001");
    assert_eq!(ctx.broker.pending(), 0);
}
