//! Firehose data transformation for API Gateway access logs.
//!
//! This module is organized into focused submodules:
//!
//! - [`model`] - Event and response wire types
//! - [`codec`] - Base64 transport encoding
//! - [`partition`] - Partition keys derived from record timestamps
//! - [`enrich`] - API key enrichment
//! - [`sizing`] - Response size accounting
//! - [`processor`] - Batch processing tying the above together
//!
//! # Example
//!
//! ```no_run
//! use apilogs_lib::firehose::{FirehoseEvent, ProcessorConfig, RecordProcessor};
//!
//! # async fn run(event: FirehoseEvent) {
//! let processor = RecordProcessor::new(ProcessorConfig::default());
//! let response = processor.process(&event).await;
//! assert_eq!(response.records.len(), event.records.len());
//! # }
//! ```

pub mod codec;
pub mod enrich;
pub mod model;
pub mod partition;
pub mod processor;
pub mod sizing;

pub use enrich::{ApiKeyDetails, ApiKeyDirectory, Enricher};
pub use model::{
    FirehoseEvent, FirehoseRecord, FirehoseResponse, FirehoseResponseRecord, RecordMetadata,
    RecordResult,
};
pub use partition::PartitionKey;
pub use processor::{ProcessorConfig, RecordProcessor};
pub use sizing::DEFAULT_RESPONSE_CEILING;
