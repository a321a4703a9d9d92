//! Tests for health check and metrics endpoints.
//!
//! The health registry is process-global, so everything that changes it
//! lives in a single test.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};
use std::sync::Arc;
use telemetry::health;
use worker::HealthProbes;

/// /health, /health/ready and /health/live follow the registry.
#[tokio::test]
async fn test_health_endpoints_follow_component_state() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for component in health().components() {
        component.set_unhealthy("not probed yet");
    }

    // Nothing reachable yet
    let response = server.get("/health").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "unhealthy");
    assert!(body["timestamp"].as_i64().is_some_and(|t| t > 0));

    let components = body["components"].as_array().expect("components array");
    let names: Vec<&str> = components.iter().filter_map(|c| c["name"].as_str()).collect();
    assert_eq!(names, vec!["broker", "database", "upstream"]);
    assert!(components.iter().all(|c| c["healthy"] == false));
    assert_eq!(components[0]["message"], "not probed yet");

    server.get("/health/live").await.assert_status_ok();
    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    // Broker and database up, FIPE API still down
    health().broker.set_healthy();
    health().database.set_healthy();

    server.get("/health/ready").await.assert_status_ok();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "degraded");

    // Probes against reachable dependencies mark everything healthy
    let probes = HealthProbes {
        broker: ctx.broker.clone(),
        store: ctx.store.clone(),
        upstream: Arc::new(ctx.upstream.clone()),
    };
    probes.check().await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["components"]
        .as_array()
        .is_some_and(|c| c.iter().all(|c| c["healthy"] == true)));

    // An unreachable FIPE API only degrades the service
    ctx.upstream.set_should_fail(true);
    probes.check().await;

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["status"], "degraded");
    assert!(body["components"][2]["message"]
        .as_str()
        .is_some_and(|m| m.contains("503")));
    server.get("/health/ready").await.assert_status_ok();

    // Losing the database takes the service out of rotation
    health().database.set_unhealthy("connection refused");
    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    server
        .get("/health")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    server.get("/health/live").await.assert_status_ok();
}

/// /metrics reports the pipeline counters after a load.
#[tokio::test]
async fn test_metrics_endpoint() {
    let ctx = TestContext::with_upstream(fixtures::small_catalog());
    let server = ctx.server();

    server.post("/initial-load").await.assert_status(StatusCode::ACCEPTED);
    ctx.drain_queue().await;

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();

    for field in [
        "messages_published",
        "messages_consumed",
        "messages_acked",
        "brands_processed",
        "models_inserted",
        "upstream_errors",
        "in_flight_deliveries",
    ] {
        assert!(body.get(field).is_some(), "Metrics should have '{}'", field);
    }

    // Counters are process-wide, so only lower bounds hold here
    assert!(body["messages_published"].as_u64().unwrap() >= 4);
    assert!(body["messages_acked"].as_u64().unwrap() >= 4);
    assert!(body["brands_processed"].as_u64().unwrap() >= 4);
    assert!(body["models_inserted"].as_u64().unwrap() >= 6);
}
