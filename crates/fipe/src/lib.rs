//! Client for the FIPE vehicle pricing table API.

pub mod client;
pub mod config;

pub use client::*;
pub use config::*;
