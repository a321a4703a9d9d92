//! End-to-end tests for the ingestion pipeline.
//!
//! These tests validate the full data flow over the in-memory queue:
//! POST /initial-load → InMemoryBroker → ConsumerWorker → IngestionProcessor
//! → MemoryStore → GET endpoints
//!
//! The mock upstream and in-memory broker implement the same traits as
//! the FIPE client and Redpanda transport, so every production code path
//! runs except the network transports.

use axum::http::StatusCode;
use catalog_core::{Brand, Model, Page, VehicleType};
use catalog_store::{CatalogStore, MemoryStore};
use fipe_client::{FipeClient, UpstreamConfig};
use integration_tests::{
    fixtures,
    setup::{fast_processing, TestContext, MAX_DELIVERIES},
};
use redpanda::NackReason;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use worker::IngestionProcessor;

fn names<T>(page: &Page<T>, name: impl Fn(&T) -> &str) -> Vec<String> {
    page.items.iter().map(|item| name(item).to_string()).collect()
}

/// Full pipeline: initial load queues every brand, the worker fills in
/// the models, reads return them ordered by name.
#[tokio::test]
async fn test_initial_load_e2e() {
    let ctx = TestContext::with_upstream(fixtures::small_catalog());
    let server = ctx.server();

    let response = server.post("/initial-load").await;
    response.assert_status(StatusCode::ACCEPTED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["data"]["totalPublished"], 4);
    assert_eq!(body["data"]["types"].as_array().map(Vec::len), Some(3));

    // Nothing is stored until the worker runs
    assert_eq!(ctx.broker.pending(), 4);
    assert_eq!(ctx.store.brand_count(), 0);

    let handled = ctx.drain_queue().await;
    assert_eq!(handled, 4, "Each brand should be delivered exactly once");
    assert_eq!(ctx.broker.acked(), 4);
    assert!(ctx.broker.dead_letters().is_empty());

    let response = server
        .get("/brands")
        .add_query_param("vehicleType", "carros")
        .await;
    response.assert_status_ok();
    let cars: Page<Brand> = response.json();
    assert_eq!(cars.total, 3);
    assert_eq!(
        names(&cars, |b| &b.nome),
        vec!["Audi", "Fiat", "VW - VolksWagen"]
    );
    assert!(cars.items.iter().all(|b| b.tipo_veiculo == VehicleType::Carros));

    let all: Page<Brand> = server.get("/brands").await.json();
    assert_eq!(all.total, 4);

    let response = server.get("/brands/21/models").await;
    response.assert_status_ok();
    let models: Page<Model> = response.json();
    assert_eq!(models.total, 2);
    assert_eq!(names(&models, |m| &m.nome), vec!["Argo", "Uno Mille"]);
    assert!(models.items.iter().all(|m| m.codigo_marca == "21" && m.nome_marca == "Fiat"));

    let stats: serde_json::Value = server.get("/stats").await.json();
    assert_eq!(stats["totalBrands"], 4);
    assert_eq!(stats["totalModels"], 6);
    assert_eq!(stats["brandsByType"]["carros"], 3);
    assert_eq!(stats["brandsByType"]["motos"], 1);
    assert_eq!(stats["brandsByType"]["caminhoes"], 0);
}

/// Loading the same catalog twice leaves one row per brand and model.
#[tokio::test]
async fn test_repeated_load_is_idempotent() {
    let ctx = TestContext::with_upstream(fixtures::small_catalog());
    let server = ctx.server();

    server.post("/initial-load").await.assert_status(StatusCode::ACCEPTED);
    ctx.drain_queue().await;
    server.post("/initial-load").await.assert_status(StatusCode::ACCEPTED);
    ctx.drain_queue().await;

    assert_eq!(ctx.broker.acked(), 8);
    assert_eq!(ctx.store.brand_count(), 4);
    assert_eq!(ctx.store.model_count(), 6);

    let brand: Brand = server.get("/brands/59").await.json();
    assert_eq!(brand.nome, "VW - VolksWagen");
}

/// A brand whose models can never be fetched keeps its row, gets no
/// models and leaves the queue after the delivery limit.
#[tokio::test]
async fn test_upstream_exhaustion_dead_letters_brand() {
    let ctx = TestContext::with_upstream(fixtures::small_catalog());
    ctx.upstream.break_brand("21");
    let server = ctx.server();

    server.post("/initial-load").await.assert_status(StatusCode::ACCEPTED);
    ctx.drain_queue().await;

    let dead = ctx.broker.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].reason, NackReason::Failed);
    assert_eq!(dead[0].delivery.attempt, MAX_DELIVERIES);
    assert_eq!(dead[0].delivery.key.as_deref(), Some("21"));

    // Every delivery retried the fetch before giving up
    let per_delivery = fast_processing().retry_policy().max_attempts;
    assert!(ctx.upstream.model_calls() >= MAX_DELIVERIES * per_delivery);

    server.get("/brands/21").await.assert_status_ok();
    let models: Page<Model> = server.get("/brands/21/models").await.json();
    assert_eq!(models.total, 0);

    // The other brands were unaffected
    assert_eq!(ctx.store.brand_count(), 4);
    assert_eq!(ctx.store.model_count(), 4);
}

/// Updating a model changes that model only.
#[tokio::test]
async fn test_model_update_refreshes_timestamp() {
    let ctx = TestContext::with_upstream(fixtures::small_catalog());
    let server = ctx.server();

    server.post("/initial-load").await.assert_status(StatusCode::ACCEPTED);
    ctx.drain_queue().await;

    // Warm the list cache before the update
    let before: Page<Model> = server.get("/brands/21/models").await.json();
    let uno = before.items.iter().find(|m| m.codigo_fipe == "2101").unwrap().clone();
    let argo = before.items.iter().find(|m| m.codigo_fipe == "2102").unwrap().clone();

    let response = server
        .put("/models/2101")
        .json(&fixtures::model_update_body(Some("Uno Way"), Some("Linha 2015")))
        .await;
    response.assert_status_ok();
    let updated: Model = response.json();
    assert_eq!(updated.nome, "Uno Way");
    assert_eq!(updated.observacoes.as_deref(), Some("Linha 2015"));
    assert_eq!(updated.data_criacao, uno.data_criacao);
    assert!(updated.data_atualizacao > uno.data_atualizacao);

    let after: Page<Model> = server.get("/brands/21/models").await.json();
    assert_eq!(names(&after, |m| &m.nome), vec!["Argo", "Uno Way"]);
    let argo_after = after.items.iter().find(|m| m.codigo_fipe == "2102").unwrap();
    assert_eq!(argo_after, &argo);

    let fetched: Model = server.get("/models/2101").await.json();
    assert_eq!(fetched, updated);

    // A blank name keeps the current one
    let response = server
        .put("/models/2101")
        .json(&fixtures::model_update_body(Some("   "), None))
        .await;
    response.assert_status_ok();
    let kept: Model = response.json();
    assert_eq!(kept.nome, "Uno Way");
}

/// A manually registered brand is queued and gets its models.
#[tokio::test]
async fn test_create_brand_e2e() {
    let upstream = fixtures::small_catalog().with_models("99", &[("9901", "Troller T4")]);
    let ctx = TestContext::with_upstream(upstream);
    let server = ctx.server();

    let response = server
        .post("/brands")
        .json(&fixtures::create_brand_body("99", "Troller", "carros"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let brand: Brand = response.json();
    assert_eq!(brand.codigo_fipe, "99");
    assert_eq!(brand.tipo_veiculo, VehicleType::Carros);
    assert_eq!(ctx.broker.pending(), 1);

    ctx.drain_queue().await;

    let models: Page<Model> = server.get("/brands/99/models").await.json();
    assert_eq!(models.total, 1);
    assert_eq!(models.items[0].nome, "Troller T4");
    assert_eq!(ctx.store.brand_count(), 1);
}

/// The processor against the real HTTP client and a stubbed FIPE API.
#[tokio::test]
async fn test_processor_with_http_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/carros/marcas/59/modelos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "modelos": [
                {"codigo": 5940, "nome": "Gol 1.0"},
                {"codigo": "5941", "nome": "Amarok"}
            ],
            "anos": [{"codigo": "2020-1", "nome": "2020 Gasolina"}]
        })))
        .mount(&server)
        .await;

    let client = FipeClient::new(&UpstreamConfig {
        base_url: server.uri(),
        timeout_ms: 2_000,
        retries: 0,
        retry_delay_ms: 1,
    })
    .unwrap();

    let store = Arc::new(MemoryStore::new());
    let ctx = TestContext::new();
    let processor = IngestionProcessor::new(
        store.clone(),
        Arc::new(client),
        ctx.cache.clone(),
        fast_processing(),
    );

    let report = processor
        .process("59", "VW - VolksWagen", VehicleType::Carros)
        .await
        .unwrap();
    assert!(report.brand_created);
    assert_eq!(report.models_fetched, 2);
    assert_eq!(report.models_inserted, 2);

    let gol = store.find_model("5940").await.unwrap().unwrap();
    assert_eq!(gol.nome, "Gol 1.0");
    assert_eq!(gol.codigo_marca, "59");
}
