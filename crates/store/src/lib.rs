//! Catalog persistence.
//!
//! Brand and model codes are unique keys; inserts that hit them fail with
//! `Error::DuplicateKey`, which callers treat as "already present".

pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;
pub mod store;

pub use config::*;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::*;
