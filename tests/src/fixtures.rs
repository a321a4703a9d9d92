//! Catalog fixtures shared by the integration tests.

use catalog_core::VehicleType;

use crate::mocks::MockUpstream;

/// Car brands in deliberately unsorted order.
pub const CAR_BRANDS: [(&str, &str); 3] = [("59", "VW - VolksWagen"), ("21", "Fiat"), ("6", "Audi")];

pub const MOTO_BRANDS: [(&str, &str); 1] = [("77", "Honda")];

/// Upstream with a small catalog: three car brands and one motorcycle
/// brand, each with distinct model codes.
pub fn small_catalog() -> MockUpstream {
    MockUpstream::new()
        .with_brands(VehicleType::Carros, &CAR_BRANDS)
        .with_brands(VehicleType::Motos, &MOTO_BRANDS)
        .with_brands(VehicleType::Caminhoes, &[])
        .with_models("59", &[("5940", "Gol 1.0"), ("5941", "Amarok")])
        .with_models("21", &[("2101", "Uno Mille"), ("2102", "Argo")])
        .with_models("6", &[("601", "A3")])
        .with_models("77", &[("7701", "CG 160")])
}

/// POST /brands body.
pub fn create_brand_body(codigo: &str, nome: &str, tipo_veiculo: &str) -> serde_json::Value {
    serde_json::json!({
        "codigo": codigo,
        "nome": nome,
        "tipoVeiculo": tipo_veiculo,
    })
}

/// PUT /models/:code body.
pub fn model_update_body(nome: Option<&str>, observacoes: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "nome": nome,
        "observacoes": observacoes,
    })
}
