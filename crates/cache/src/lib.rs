//! Read-through cache for catalog queries.
//!
//! Invalidation never enumerates keys: every kind and scope has a version
//! counter that is part of the physical key, so bumping it orphans all
//! older entries at once and they age out by TTL.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod key;
pub mod moka_backend;

pub use backend::*;
pub use catalog::*;
pub use config::*;
pub use key::*;
pub use moka_backend::*;
