//! Catalog services used by the REST layer.
//!
//! [`QueryService`] serves reads through the cache and applies model edits.
//! [`CatalogService`] registers brands by hand and triggers the initial
//! load, both ending in queue messages for the worker.

pub mod commands;
pub mod query;

pub use commands::*;
pub use query::*;

#[cfg(test)]
pub(crate) mod testing;
