//! Core types, validation and errors for the FIPE catalog pipeline.

pub mod error;
pub mod message;
pub mod model;
pub mod retry;

pub use error::{Error, Result};
pub use message::BrandMessage;
pub use model::*;
pub use retry::RetryPolicy;
