//! PostgreSQL table definitions.

/// Brands, unique by FIPE code.
pub const CREATE_MARCAS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS marcas (
    id BIGSERIAL PRIMARY KEY,
    codigo_fipe VARCHAR(32) NOT NULL UNIQUE,
    nome VARCHAR(255) NOT NULL,
    tipo_veiculo VARCHAR(16) NOT NULL,
    data_criacao TIMESTAMPTZ NOT NULL DEFAULT now(),
    data_atualizacao TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Listing by vehicle type is ordered by name.
pub const CREATE_MARCAS_TIPO_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_marca_tipo_nome ON marcas (LOWER(tipo_veiculo), nome)
"#;

/// Models, unique by FIPE code across the whole catalog.
pub const CREATE_MODELOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS modelos (
    id BIGSERIAL PRIMARY KEY,
    codigo_fipe VARCHAR(32) NOT NULL UNIQUE,
    nome VARCHAR(255) NOT NULL,
    observacoes TEXT,
    marca_id BIGINT NOT NULL REFERENCES marcas (id) ON DELETE CASCADE,
    data_criacao TIMESTAMPTZ NOT NULL DEFAULT now(),
    data_atualizacao TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

pub const CREATE_MODELOS_MARCA_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_modelo_marca_nome ON modelos (marca_id, nome)
"#;

/// All DDL statements, in dependency order.
pub fn all_statements() -> Vec<&'static str> {
    vec![
        CREATE_MARCAS_TABLE,
        CREATE_MARCAS_TIPO_INDEX,
        CREATE_MODELOS_TABLE,
        CREATE_MODELOS_MARCA_INDEX,
    ]
}
