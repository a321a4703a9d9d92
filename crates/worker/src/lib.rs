//! Background workers for the brand pipeline.
//!
//! - Consumer (queue → IngestionProcessor, ack/nack per delivery)
//! - Processor (brand upsert, model fetch with retries, model inserts)
//! - Scheduler (periodic health probes and metrics log)

pub mod consumer;
pub mod processor;
pub mod scheduler;

pub use consumer::*;
pub use processor::*;
pub use scheduler::*;

#[cfg(test)]
pub(crate) mod testing;
