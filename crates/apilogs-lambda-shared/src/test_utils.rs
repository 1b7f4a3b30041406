//! Test utilities for Lambda handler testing.
//!
//! This module provides in-memory stand-ins for the AWS services the
//! handlers talk to, plus helpers for building invocation events.
//!
//! # Usage
//!
//! These utilities are only available in test builds or with the
//! `test-utils` feature:
//!
//! ```ignore
//! use apilogs_lambda_shared::test_utils::{firehose_event, lambda_event, StaticApiKeyDirectory};
//!
//! #[tokio::test]
//! async fn test_handler() {
//!     let event = lambda_event(firehose_event(&[r#"{"ts":1700000000}"#]));
//!     // ... invoke handler
//! }
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use lambda_runtime::{Context, LambdaEvent};
use serde::Serialize;
use serde_json::Value;

use apilogs_lib::crawler::{CrawlerService, CrawlerSnapshot, CrawlerStatus, LastCrawl, LastCrawlStatus};
use apilogs_lib::firehose::codec::encode_data;
use apilogs_lib::firehose::{ApiKeyDetails, ApiKeyDirectory, FirehoseEvent, FirehoseRecord};
use apilogs_lib::ServiceError;

/// Arrival timestamp stamped on fixture records (2023-11-14T22:13:20Z).
pub const FIXTURE_ARRIVAL_MILLIS: i64 = 1_700_000_000_000;

/// Start time of the first crawl finished by [`FakeCrawler::finish`]; each
/// later crawl started one minute after the previous one.
pub const FAKE_CRAWL_EPOCH_MILLIS: i64 = 1_700_000_000_000;

/// Create a mock request ID for testing.
///
/// Since `lambda_runtime::Context` is non-exhaustive and cannot be directly
/// constructed, tests should use the request ID directly for assertions.
pub fn mock_request_id(suffix: &str) -> String {
    format!("test-request-{}", suffix)
}

/// Wrap a payload in a `LambdaEvent` with a default context.
pub fn lambda_event<T: Serialize>(payload: T) -> LambdaEvent<Value> {
    let mut context = Context::default();
    context.request_id = mock_request_id("invocation");
    let payload = serde_json::to_value(payload).expect("serializable payload");
    LambdaEvent::new(payload, context)
}

/// Build a Firehose batch whose records carry the given payloads, in order.
pub fn firehose_event(payloads: &[&str]) -> FirehoseEvent {
    FirehoseEvent {
        invocation_id: "00540a87-5050-496a-84e4-e7d92bbaf5e2".to_string(),
        delivery_stream_arn: Some(
            "arn:aws:firehose:eu-west-1:123456789012:deliverystream/amazon-apigateway-logs-delivery-stream"
                .to_string(),
        ),
        region: Some("eu-west-1".to_string()),
        records: payloads
            .iter()
            .enumerate()
            .map(|(i, payload)| FirehoseRecord {
                record_id: format!("record-{:04}", i),
                approximate_arrival_timestamp: Some(FIXTURE_ARRIVAL_MILLIS),
                data: encode_data(payload.as_bytes()),
            })
            .collect(),
    }
}

/// API key directory backed by a fixed map. Unknown ids are `NotFound`.
#[derive(Debug, Default)]
pub struct StaticApiKeyDirectory {
    keys: HashMap<String, ApiKeyDetails>,
    lookups: Mutex<u32>,
}

impl StaticApiKeyDirectory {
    pub fn with_key(mut self, id: &str, name: &str, description: &str) -> Self {
        self.keys.insert(
            id.to_string(),
            ApiKeyDetails {
                name: Some(name.to_string()),
                description: Some(description.to_string()),
            },
        );
        self
    }

    /// Number of lookups served so far.
    pub fn lookups(&self) -> u32 {
        *self.lookups.lock().expect("lookup counter poisoned")
    }
}

#[async_trait]
impl ApiKeyDirectory for StaticApiKeyDirectory {
    async fn lookup(&self, key_id: &str) -> Result<ApiKeyDetails, ServiceError> {
        *self.lookups.lock().expect("lookup counter poisoned") += 1;
        self.keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                kind: "api key",
                name: key_id.to_string(),
            })
    }
}

/// In-memory crawler whose state tests set directly.
///
/// Starting a `READY` crawler flips it to `RUNNING`; starting a crawler that
/// is not `READY` is rejected the way Glue rejects it.
#[derive(Debug)]
pub struct FakeCrawler {
    snapshot: Mutex<CrawlerSnapshot>,
    starts: Mutex<u32>,
    query_error: Mutex<Option<ServiceError>>,
}

impl FakeCrawler {
    pub fn new(name: &str) -> Self {
        Self {
            snapshot: Mutex::new(CrawlerSnapshot::never_run(name)),
            starts: Mutex::new(0),
            query_error: Mutex::new(None),
        }
    }

    /// Move the crawler to `status`.
    pub fn set_status(&self, status: CrawlerStatus) {
        self.snapshot.lock().expect("crawler poisoned").status = status;
    }

    /// Finish the current crawl with `status`.
    ///
    /// The crawl is stamped with a start time derived from the number of
    /// accepted starts, so every run is distinguishable.
    pub fn finish(&self, status: LastCrawlStatus, error_message: Option<&str>) {
        let mut snapshot = self.snapshot.lock().expect("crawler poisoned");
        snapshot.status = CrawlerStatus::Ready;
        let run = i64::from(*self.starts.lock().expect("crawler poisoned"));
        snapshot.last_crawl = Some(LastCrawl {
            status,
            error_message: error_message.map(str::to_string),
            started_at: Some(FAKE_CRAWL_EPOCH_MILLIS + run * 60_000),
        });
    }

    /// Make every subsequent status query fail with `error` (or succeed again
    /// with `None`).
    pub fn fail_queries(&self, error: Option<ServiceError>) {
        *self.query_error.lock().expect("crawler poisoned") = error;
    }

    pub fn starts(&self) -> u32 {
        *self.starts.lock().expect("crawler poisoned")
    }
}

#[async_trait]
impl CrawlerService for FakeCrawler {
    async fn get_crawler(&self, _name: &str) -> Result<CrawlerSnapshot, ServiceError> {
        if let Some(error) = self.query_error.lock().expect("crawler poisoned").clone() {
            return Err(error);
        }
        Ok(self.snapshot.lock().expect("crawler poisoned").clone())
    }

    async fn start_crawler(&self, name: &str) -> Result<(), ServiceError> {
        let mut snapshot = self.snapshot.lock().expect("crawler poisoned");
        if snapshot.status != CrawlerStatus::Ready {
            return Err(ServiceError::AlreadyRunning {
                name: name.to_string(),
            });
        }
        snapshot.status = CrawlerStatus::Running;
        *self.starts.lock().expect("crawler poisoned") += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apilogs_lib::firehose::codec::decode_data;

    #[test]
    fn mock_request_id_formats_correctly() {
        let id = mock_request_id("123");
        assert_eq!(id, "test-request-123");
    }

    #[test]
    fn firehose_event_encodes_payloads_in_order() {
        let event = firehose_event(&["{\"a\":1}", "{\"b\":2}"]);
        assert_eq!(event.records.len(), 2);
        assert_eq!(event.records[1].record_id, "record-0001");
        assert_eq!(decode_data(&event.records[0].data).unwrap(), b"{\"a\":1}");
    }

    #[tokio::test]
    async fn fake_crawler_rejects_second_start() {
        let crawler = FakeCrawler::new("apilogs");
        crawler.start_crawler("apilogs").await.unwrap();
        let err = crawler.start_crawler("apilogs").await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyRunning { .. }));
        assert_eq!(crawler.starts(), 1);
    }

    #[tokio::test]
    async fn static_directory_counts_lookups() {
        let directory = StaticApiKeyDirectory::default().with_key("k1", "First", "First key");
        assert!(directory.lookup("k1").await.is_ok());
        assert!(directory.lookup("missing").await.is_err());
        assert_eq!(directory.lookups(), 2);
    }
}
