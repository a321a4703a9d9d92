//! PostgreSQL store on sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::{debug, info};

use catalog_core::{
    Brand, Error, Model, ModelUpdate, NewBrand, NewModel, PageRequest, Result, VehicleType,
};

use crate::config::StoreConfig;
use crate::error::{map_db_error, map_write_error};
use crate::schema::all_statements;
use crate::store::CatalogStore;

const BRAND_COLUMNS: &str = "id, codigo_fipe, nome, tipo_veiculo, data_criacao, data_atualizacao";

const MODEL_SELECT: &str = "SELECT m.id, m.codigo_fipe, m.nome, m.observacoes, m.marca_id, \
     b.codigo_fipe AS codigo_marca, b.nome AS nome_marca, m.data_criacao, m.data_atualizacao \
     FROM modelos m JOIN marcas b ON b.id = m.marca_id";

#[derive(Debug, FromRow)]
struct BrandRow {
    id: i64,
    codigo_fipe: String,
    nome: String,
    tipo_veiculo: String,
    data_criacao: DateTime<Utc>,
    data_atualizacao: DateTime<Utc>,
}

impl TryFrom<BrandRow> for Brand {
    type Error = Error;

    fn try_from(row: BrandRow) -> Result<Self> {
        Ok(Brand {
            id: row.id,
            codigo_fipe: row.codigo_fipe,
            nome: row.nome,
            tipo_veiculo: row.tipo_veiculo.parse()?,
            data_criacao: row.data_criacao,
            data_atualizacao: row.data_atualizacao,
        })
    }
}

#[derive(Debug, FromRow)]
struct ModelRow {
    id: i64,
    codigo_fipe: String,
    nome: String,
    observacoes: Option<String>,
    marca_id: i64,
    codigo_marca: String,
    nome_marca: String,
    data_criacao: DateTime<Utc>,
    data_atualizacao: DateTime<Utc>,
}

impl From<ModelRow> for Model {
    fn from(row: ModelRow) -> Self {
        Model {
            id: row.id,
            codigo_fipe: row.codigo_fipe,
            nome: row.nome,
            observacoes: row.observacoes,
            brand_id: row.marca_id,
            codigo_marca: row.codigo_marca,
            nome_marca: row.nome_marca,
            data_criacao: row.data_criacao,
            data_atualizacao: row.data_atualizacao,
        }
    }
}

/// Store backed by a shared `PgPool`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect(&config.url)
            .await
            .map_err(|e| map_db_error(e, "connect"))?;

        info!(max_connections = config.max_connections, "Connected to PostgreSQL");

        let store = Self { pool };
        if config.init_schema {
            store.init_schema().await?;
        }
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they don't exist.
    pub async fn init_schema(&self) -> Result<()> {
        for ddl in all_statements() {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| map_db_error(e, "init schema"))?;
        }
        debug!("PostgreSQL schema initialized");
        Ok(())
    }
}

fn limit_offset(page: PageRequest) -> (i64, i64) {
    (page.size as i64, page.offset() as i64)
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn find_brand(&self, code: &str) -> Result<Option<Brand>> {
        let sql = format!("SELECT {} FROM marcas WHERE codigo_fipe = $1", BRAND_COLUMNS);
        sqlx::query_as::<_, BrandRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "find brand"))?
            .map(Brand::try_from)
            .transpose()
    }

    async fn insert_brand(&self, brand: &NewBrand) -> Result<Brand> {
        let sql = format!(
            "INSERT INTO marcas (codigo_fipe, nome, tipo_veiculo) VALUES ($1, $2, $3) RETURNING {}",
            BRAND_COLUMNS
        );
        sqlx::query_as::<_, BrandRow>(&sql)
            .bind(&brand.codigo_fipe)
            .bind(&brand.nome)
            .bind(brand.tipo_veiculo.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &format!("brand {}", brand.codigo_fipe)))?
            .try_into()
    }

    async fn list_brands(
        &self,
        vehicle_type: Option<VehicleType>,
        page: PageRequest,
    ) -> Result<Vec<Brand>> {
        let (limit, offset) = limit_offset(page);
        let sql = format!(
            "SELECT {} FROM marcas \
             WHERE ($1::text IS NULL OR LOWER(tipo_veiculo) = LOWER($1)) \
             ORDER BY nome, codigo_fipe LIMIT $2 OFFSET $3",
            BRAND_COLUMNS
        );
        sqlx::query_as::<_, BrandRow>(&sql)
            .bind(vehicle_type.map(|vt| vt.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "list brands"))?
            .into_iter()
            .map(Brand::try_from)
            .collect()
    }

    async fn count_brands(&self, vehicle_type: Option<VehicleType>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM marcas WHERE ($1::text IS NULL OR LOWER(tipo_veiculo) = LOWER($1))",
        )
        .bind(vehicle_type.map(|vt| vt.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "count brands"))?;
        Ok(count as u64)
    }

    async fn find_model(&self, code: &str) -> Result<Option<Model>> {
        let sql = format!("{} WHERE m.codigo_fipe = $1", MODEL_SELECT);
        Ok(sqlx::query_as::<_, ModelRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "find model"))?
            .map(Model::from))
    }

    async fn model_exists(&self, code: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM modelos WHERE codigo_fipe = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "model exists"))
    }

    async fn insert_model(&self, model: &NewModel) -> Result<Model> {
        let row = sqlx::query_as::<_, ModelRow>(
            "WITH m AS ( \
                 INSERT INTO modelos (codigo_fipe, nome, marca_id) VALUES ($1, $2, $3) \
                 RETURNING id, codigo_fipe, nome, observacoes, marca_id, data_criacao, data_atualizacao \
             ) \
             SELECT m.id, m.codigo_fipe, m.nome, m.observacoes, m.marca_id, \
                    b.codigo_fipe AS codigo_marca, b.nome AS nome_marca, \
                    m.data_criacao, m.data_atualizacao \
             FROM m JOIN marcas b ON b.id = m.marca_id",
        )
        .bind(&model.codigo_fipe)
        .bind(&model.nome)
        .bind(model.brand_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &format!("model {}", model.codigo_fipe)))?;
        Ok(row.into())
    }

    async fn list_models(&self, brand_id: i64, page: PageRequest) -> Result<Vec<Model>> {
        let (limit, offset) = limit_offset(page);
        let sql = format!(
            "{} WHERE m.marca_id = $1 ORDER BY m.nome, m.codigo_fipe LIMIT $2 OFFSET $3",
            MODEL_SELECT
        );
        Ok(sqlx::query_as::<_, ModelRow>(&sql)
            .bind(brand_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "list models"))?
            .into_iter()
            .map(Model::from)
            .collect())
    }

    async fn count_models(&self, brand_id: Option<i64>) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM modelos WHERE ($1::bigint IS NULL OR marca_id = $1)")
                .bind(brand_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_db_error(e, "count models"))?;
        Ok(count as u64)
    }

    async fn update_model(&self, code: &str, update: &ModelUpdate) -> Result<Option<Model>> {
        let row = sqlx::query_as::<_, ModelRow>(
            "WITH m AS ( \
                 UPDATE modelos SET \
                     nome = COALESCE($2, nome), \
                     observacoes = COALESCE($3, observacoes), \
                     data_atualizacao = GREATEST(clock_timestamp(), data_atualizacao + INTERVAL '1 microsecond') \
                 WHERE codigo_fipe = $1 \
                 RETURNING id, codigo_fipe, nome, observacoes, marca_id, data_criacao, data_atualizacao \
             ) \
             SELECT m.id, m.codigo_fipe, m.nome, m.observacoes, m.marca_id, \
                    b.codigo_fipe AS codigo_marca, b.nome AS nome_marca, \
                    m.data_criacao, m.data_atualizacao \
             FROM m JOIN marcas b ON b.id = m.marca_id",
        )
        .bind(code)
        .bind(update.nome())
        .bind(update.observacoes.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "update model"))?;
        Ok(row.map(Model::from))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "ping"))?;
        Ok(())
    }
}
