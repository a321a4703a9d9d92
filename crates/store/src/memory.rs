//! In-memory store with the same uniqueness and ordering rules as Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use catalog_core::{
    Brand, Error, Model, ModelUpdate, NewBrand, NewModel, PageRequest, Result, VehicleType,
};

use crate::store::CatalogStore;

#[derive(Debug, Clone)]
struct ModelRecord {
    id: i64,
    codigo_fipe: String,
    nome: String,
    observacoes: Option<String>,
    brand_id: i64,
    data_criacao: DateTime<Utc>,
    data_atualizacao: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    brands: Vec<Brand>,
    models: Vec<ModelRecord>,
    next_brand_id: i64,
    next_model_id: i64,
}

impl Tables {
    fn join(&self, m: &ModelRecord) -> Result<Model> {
        let brand = self
            .brands
            .iter()
            .find(|b| b.id == m.brand_id)
            .ok_or_else(|| Error::internal(format!("model {} has no brand", m.codigo_fipe)))?;
        Ok(Model {
            id: m.id,
            codigo_fipe: m.codigo_fipe.clone(),
            nome: m.nome.clone(),
            observacoes: m.observacoes.clone(),
            brand_id: m.brand_id,
            codigo_marca: brand.codigo_fipe.clone(),
            nome_marca: brand.nome.clone(),
            data_criacao: m.data_criacao,
            data_atualizacao: m.data_atualizacao,
        })
    }
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    items
        .iter()
        .skip(page.offset() as usize)
        .take(page.size as usize)
        .cloned()
        .collect()
}

/// Store held in process memory; used for single-node runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brand_count(&self) -> usize {
        self.tables.read().brands.len()
    }

    pub fn model_count(&self) -> usize {
        self.tables.read().models.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_brand(&self, code: &str) -> Result<Option<Brand>> {
        Ok(self
            .tables
            .read()
            .brands
            .iter()
            .find(|b| b.codigo_fipe == code)
            .cloned())
    }

    async fn insert_brand(&self, brand: &NewBrand) -> Result<Brand> {
        let mut tables = self.tables.write();
        if tables.brands.iter().any(|b| b.codigo_fipe == brand.codigo_fipe) {
            return Err(Error::duplicate(format!("brand {}", brand.codigo_fipe)));
        }

        tables.next_brand_id += 1;
        let now = Utc::now();
        let row = Brand {
            id: tables.next_brand_id,
            codigo_fipe: brand.codigo_fipe.clone(),
            nome: brand.nome.clone(),
            tipo_veiculo: brand.tipo_veiculo,
            data_criacao: now,
            data_atualizacao: now,
        };
        tables.brands.push(row.clone());
        Ok(row)
    }

    async fn list_brands(
        &self,
        vehicle_type: Option<VehicleType>,
        page: PageRequest,
    ) -> Result<Vec<Brand>> {
        let tables = self.tables.read();
        let mut brands: Vec<Brand> = tables
            .brands
            .iter()
            .filter(|b| vehicle_type.map_or(true, |vt| b.tipo_veiculo == vt))
            .cloned()
            .collect();
        brands.sort_by(|a, b| (&a.nome, &a.codigo_fipe).cmp(&(&b.nome, &b.codigo_fipe)));
        Ok(paginate(&brands, page))
    }

    async fn count_brands(&self, vehicle_type: Option<VehicleType>) -> Result<u64> {
        Ok(self
            .tables
            .read()
            .brands
            .iter()
            .filter(|b| vehicle_type.map_or(true, |vt| b.tipo_veiculo == vt))
            .count() as u64)
    }

    async fn find_model(&self, code: &str) -> Result<Option<Model>> {
        let tables = self.tables.read();
        tables
            .models
            .iter()
            .find(|m| m.codigo_fipe == code)
            .map(|m| tables.join(m))
            .transpose()
    }

    async fn insert_model(&self, model: &NewModel) -> Result<Model> {
        let mut tables = self.tables.write();
        if tables.models.iter().any(|m| m.codigo_fipe == model.codigo_fipe) {
            return Err(Error::duplicate(format!("model {}", model.codigo_fipe)));
        }
        if !tables.brands.iter().any(|b| b.id == model.brand_id) {
            return Err(Error::database(format!(
                "model {}: brand {} does not exist",
                model.codigo_fipe, model.brand_id
            )));
        }

        tables.next_model_id += 1;
        let now = Utc::now();
        let record = ModelRecord {
            id: tables.next_model_id,
            codigo_fipe: model.codigo_fipe.clone(),
            nome: model.nome.clone(),
            observacoes: None,
            brand_id: model.brand_id,
            data_criacao: now,
            data_atualizacao: now,
        };
        let joined = tables.join(&record)?;
        tables.models.push(record);
        Ok(joined)
    }

    async fn list_models(&self, brand_id: i64, page: PageRequest) -> Result<Vec<Model>> {
        let tables = self.tables.read();
        let mut models: Vec<&ModelRecord> =
            tables.models.iter().filter(|m| m.brand_id == brand_id).collect();
        models.sort_by(|a, b| (&a.nome, &a.codigo_fipe).cmp(&(&b.nome, &b.codigo_fipe)));

        models
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .map(|m| tables.join(m))
            .collect()
    }

    async fn count_models(&self, brand_id: Option<i64>) -> Result<u64> {
        Ok(self
            .tables
            .read()
            .models
            .iter()
            .filter(|m| brand_id.map_or(true, |id| m.brand_id == id))
            .count() as u64)
    }

    async fn update_model(&self, code: &str, update: &ModelUpdate) -> Result<Option<Model>> {
        let mut tables = self.tables.write();
        let Some(record) = tables.models.iter_mut().find(|m| m.codigo_fipe == code) else {
            return Ok(None);
        };

        if let Some(nome) = update.nome() {
            record.nome = nome.to_string();
        }
        if let Some(obs) = &update.observacoes {
            record.observacoes = Some(obs.clone());
        }
        // Strictly newer even when the clock has not advanced.
        record.data_atualizacao = Utc::now().max(record.data_atualizacao + Duration::microseconds(1));

        let record = record.clone();
        tables.join(&record).map(Some)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
