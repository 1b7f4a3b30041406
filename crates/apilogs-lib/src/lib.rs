//! API access-log pipeline library entry points.
//!
//! This crate holds the logic behind the pipeline's Lambda handlers: the
//! Firehose transformation that partitions and enriches API Gateway access
//! logs, and the custom-resource lifecycle that drives the Glue crawler.
//! The Lambda crates should only depend on what is exported here instead of
//! reimplementing behavior.
//!

#![deny(warnings)]

pub mod crawler;
pub mod error;
pub mod firehose;

pub use crawler::{
    check_status, drive_to_completion, handle_is_complete, handle_on_event, start_job,
    CrawlerService, CustomResourceEvent, JobState, PollSchedule, StatusReport,
};
pub use error::{Error, RecordError, Result, ServiceError};
pub use firehose::{
    ApiKeyDetails, ApiKeyDirectory, FirehoseEvent, FirehoseResponse, PartitionKey,
    ProcessorConfig, RecordProcessor, RecordResult,
};
