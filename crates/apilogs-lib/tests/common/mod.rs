//! Common test utilities: an in-memory crawler and API key directory.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use apilogs_lib::crawler::{CrawlerSnapshot, CrawlerService, CrawlerStatus, LastCrawl, LastCrawlStatus};
use apilogs_lib::firehose::codec::encode_data;
use apilogs_lib::firehose::{ApiKeyDetails, ApiKeyDirectory, FirehoseEvent, FirehoseRecord};
use apilogs_lib::ServiceError;
use async_trait::async_trait;

/// What a started crawl does on each status query.
#[derive(Debug, Clone)]
pub enum Step {
    /// Report `RUNNING`.
    Running,
    /// Fail the query transiently.
    QueryError,
    /// Finish with the given status.
    Finish(LastCrawlStatus),
}

/// Crawler that walks through a script of steps once started.
pub struct ScriptedCrawler {
    inner: Mutex<Inner>,
}

struct Inner {
    snapshot: CrawlerSnapshot,
    script: VecDeque<Step>,
    starts: u32,
    queries: u32,
}

impl ScriptedCrawler {
    pub fn new(name: &str, script: Vec<Step>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                snapshot: CrawlerSnapshot::never_run(name),
                script: script.into(),
                starts: 0,
                queries: 0,
            }),
        }
    }

    pub fn starts(&self) -> u32 {
        self.inner.lock().unwrap().starts
    }

    pub fn queries(&self) -> u32 {
        self.inner.lock().unwrap().queries
    }
}

#[async_trait]
impl CrawlerService for ScriptedCrawler {
    async fn get_crawler(&self, _name: &str) -> Result<CrawlerSnapshot, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.queries += 1;
        if inner.snapshot.status == CrawlerStatus::Running {
            match inner.script.pop_front() {
                Some(Step::Running) | None => {}
                Some(Step::QueryError) => return Err(ServiceError::transient("rate exceeded")),
                Some(Step::Finish(status)) => {
                    inner.snapshot.status = CrawlerStatus::Ready;
                    inner.snapshot.last_crawl = Some(LastCrawl {
                        status,
                        error_message: None,
                        started_at: Some(i64::from(inner.starts)),
                    });
                }
            }
        }
        Ok(inner.snapshot.clone())
    }

    async fn start_crawler(&self, name: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.snapshot.status != CrawlerStatus::Ready {
            return Err(ServiceError::AlreadyRunning {
                name: name.to_string(),
            });
        }
        inner.snapshot.status = CrawlerStatus::Running;
        inner.starts += 1;
        Ok(())
    }
}

/// Directory backed by a fixed map.
pub struct MapDirectory(pub HashMap<String, ApiKeyDetails>);

#[async_trait]
impl ApiKeyDirectory for MapDirectory {
    async fn lookup(&self, key_id: &str) -> Result<ApiKeyDetails, ServiceError> {
        self.0.get(key_id).cloned().ok_or_else(|| ServiceError::NotFound {
            kind: "api key",
            name: key_id.to_string(),
        })
    }
}

/// Build a batch whose records carry the given JSON payloads.
pub fn batch(payloads: &[&str]) -> FirehoseEvent {
    FirehoseEvent {
        invocation_id: "invocation-test".to_string(),
        delivery_stream_arn: Some(
            "arn:aws:firehose:eu-west-1:123456789012:deliverystream/amazon-apigateway-logs-delivery-stream"
                .to_string(),
        ),
        region: Some("eu-west-1".to_string()),
        records: payloads
            .iter()
            .enumerate()
            .map(|(i, payload)| FirehoseRecord {
                record_id: format!("record-{}", i),
                approximate_arrival_timestamp: Some(1_700_000_000_000),
                data: encode_data(payload.as_bytes()),
            })
            .collect(),
    }
}
