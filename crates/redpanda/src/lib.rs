//! Work queue for brand processing: Redpanda (rskafka) and in-memory
//! brokers behind common publish/receive seams.

pub mod client;
pub mod config;
pub mod consumer;
pub mod health;
pub mod memory;
pub mod producer;
pub mod publisher;
pub mod topics;
pub mod transport;

pub use config::*;
pub use consumer::*;
pub use memory::*;
pub use producer::*;
pub use publisher::*;
pub use topics::*;
pub use transport::*;
