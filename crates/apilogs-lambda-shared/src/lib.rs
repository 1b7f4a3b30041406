//! Shared infrastructure for the API logs pipeline AWS Lambda functions.
//!
//! This crate provides common functionality used across all Lambda handlers:
//!
//! - [`init_tracing`]: JSON-formatted tracing for CloudWatch Logs
//! - [`EnricherConfig`]: Environment configuration read at cold start
//! - [`GlueCrawlerService`] and [`ApiGatewayKeyDirectory`]: AWS SDK adapters
//!   for the service seams defined in `apilogs-lib`
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides in-memory services and event builders
//! for Lambda handler testing. Enable the `test-utils` feature to access it
//! from dependent crates.

#![deny(warnings)]

mod aws;
mod config;
mod tracing_init;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aws::{load_sdk_config, ApiGatewayKeyDirectory, GlueCrawlerService};
pub use config::{EnricherConfig, ENRICH_API_KEYS_ENV, RESPONSE_CEILING_ENV};
pub use tracing_init::{init_tracing, LogFormat};
