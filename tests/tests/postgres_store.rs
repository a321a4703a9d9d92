//! Tests for the PostgreSQL catalog store.
//!
//! Requires Docker for the PostgreSQL testcontainer, or
//! `FIPE_TEST_DATABASE_URL` pointing at a scratch database.
//! Run with `--ignored`.

use catalog_core::{Error, ModelUpdate, NewBrand, NewModel, PageRequest, VehicleType};
use catalog_store::{CatalogStore, PostgresStore};
use integration_tests::containers::TestContainers;

fn brand(code: &str, name: &str, vehicle_type: VehicleType) -> NewBrand {
    NewBrand {
        codigo_fipe: code.into(),
        nome: name.into(),
        tipo_veiculo: vehicle_type,
    }
}

fn model(code: &str, name: &str, brand_id: i64) -> NewModel {
    NewModel {
        codigo_fipe: code.into(),
        nome: name.into(),
        brand_id,
    }
}

async fn reset(store: &PostgresStore) {
    sqlx::query("TRUNCATE modelos, marcas RESTART IDENTITY CASCADE")
        .execute(store.pool())
        .await
        .expect("Failed to truncate tables");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_brand_uniqueness_and_ordering() {
    let containers = TestContainers::start().await;
    let store = containers.store().await;
    reset(&store).await;

    store.ping().await.unwrap();

    store.insert_brand(&brand("59", "VW - VolksWagen", VehicleType::Carros)).await.unwrap();
    store.insert_brand(&brand("21", "Fiat", VehicleType::Carros)).await.unwrap();
    store.insert_brand(&brand("77", "Honda", VehicleType::Motos)).await.unwrap();

    let duplicate = store.insert_brand(&brand("21", "Fiat", VehicleType::Motos)).await;
    assert!(matches!(duplicate, Err(Error::DuplicateKey(_))));

    let cars = store
        .list_brands(Some(VehicleType::Carros), PageRequest::default())
        .await
        .unwrap();
    let names: Vec<_> = cars.iter().map(|b| b.nome.as_str()).collect();
    assert_eq!(names, vec!["Fiat", "VW - VolksWagen"]);

    assert_eq!(store.count_brands(None).await.unwrap(), 3);
    assert_eq!(store.count_brands(Some(VehicleType::Motos)).await.unwrap(), 1);

    let fiat = store.find_brand("21").await.unwrap().unwrap();
    assert_eq!(fiat.tipo_veiculo, VehicleType::Carros);
    assert!(store.find_brand("404").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_models_join_brand_and_update() {
    let containers = TestContainers::start().await;
    let store = containers.store().await;
    reset(&store).await;

    let fiat = store.insert_brand(&brand("21", "Fiat", VehicleType::Carros)).await.unwrap();
    store.insert_model(&model("2102", "Uno Mille", fiat.id)).await.unwrap();
    let argo = store.insert_model(&model("2101", "Argo", fiat.id)).await.unwrap();
    assert_eq!(argo.codigo_marca, "21");
    assert_eq!(argo.nome_marca, "Fiat");

    let duplicate = store.insert_model(&model("2101", "Argo", fiat.id)).await;
    assert!(matches!(duplicate, Err(Error::DuplicateKey(_))));
    assert!(store.model_exists("2101").await.unwrap());

    let models = store.list_models(fiat.id, PageRequest::default()).await.unwrap();
    let names: Vec<_> = models.iter().map(|m| m.nome.as_str()).collect();
    assert_eq!(names, vec!["Argo", "Uno Mille"]);
    assert_eq!(store.count_models(Some(fiat.id)).await.unwrap(), 2);

    let updated = store
        .update_model(
            "2101",
            &ModelUpdate {
                nome: Some("Argo Drive".into()),
                observacoes: Some("1.3".into()),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.nome, "Argo Drive");
    assert_eq!(updated.observacoes.as_deref(), Some("1.3"));
    assert!(updated.data_atualizacao > argo.data_atualizacao);

    let untouched = store.find_model("2102").await.unwrap().unwrap();
    assert_eq!(untouched.nome, "Uno Mille");

    assert!(store
        .update_model("404", &ModelUpdate::default())
        .await
        .unwrap()
        .is_none());
}
