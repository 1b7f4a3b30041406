//! `onEvent` side of the crawler lifecycle: start the crawl once.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::crawler::custom_resource::{
    CustomResourceEvent, OnEventResponse, RequestType, CRAWLER_NAME_KEY, SUPERSEDED_CRAWL_KEY,
};
use crate::crawler::service::CrawlerService;
use crate::crawler::state::JobState;
use crate::error::{Error, Result, ServiceError};

/// What a start request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A crawl was requested and accepted.
    Started,
    /// A crawl was already in progress; nothing was done.
    AlreadyRunning,
    /// A duplicate `Create` found the crawl already finished.
    AlreadySucceeded,
    /// Nothing to do for this request type.
    Skipped,
}

impl StartOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartOutcome::Started => "started",
            StartOutcome::AlreadyRunning => "already-running",
            StartOutcome::AlreadySucceeded => "already-succeeded",
            StartOutcome::Skipped => "skipped",
        }
    }

    /// State the job is in right after this outcome.
    pub fn job_state(&self) -> Option<JobState> {
        match self {
            StartOutcome::Started => Some(JobState::Starting),
            StartOutcome::AlreadyRunning => Some(JobState::Running),
            StartOutcome::AlreadySucceeded => Some(JobState::Succeeded),
            StartOutcome::Skipped => None,
        }
    }
}

/// Start the named crawler unless it is already underway.
///
/// The current state is read first. A crawl in progress is never started
/// twice, and a repeated `Create` that finds the last crawl succeeded is a
/// no-op. `Update` re-crawls once the crawler is idle. If the state cannot be
/// read, the start is attempted anyway since the service itself rejects
/// concurrent crawls.
pub async fn start_job(
    service: &dyn CrawlerService,
    name: &str,
    request_type: RequestType,
) -> std::result::Result<StartOutcome, ServiceError> {
    start(service, name, request_type)
        .await
        .map(|(outcome, _)| outcome)
}

/// [`start_job`], also returning the start time of the previous crawl when a
/// new one was started on top of it.
async fn start(
    service: &dyn CrawlerService,
    name: &str,
    request_type: RequestType,
) -> std::result::Result<(StartOutcome, Option<i64>), ServiceError> {
    if request_type == RequestType::Delete {
        return Ok((StartOutcome::Skipped, None));
    }

    let mut superseded = None;
    match service.get_crawler(name).await {
        Ok(snapshot) => match snapshot.job_state() {
            state if state.is_underway() => {
                info!(crawler = %name, state = %state, "crawler already underway, not starting");
                return Ok((StartOutcome::AlreadyRunning, None));
            }
            JobState::Succeeded if request_type == RequestType::Create => {
                info!(crawler = %name, "crawler already succeeded, not starting");
                return Ok((StartOutcome::AlreadySucceeded, None));
            }
            _ => superseded = snapshot.last_crawl.and_then(|last| last.started_at),
        },
        Err(e @ ServiceError::NotFound { .. }) => return Err(e),
        Err(e) => {
            warn!(crawler = %name, error = %e, "could not read crawler state, attempting start");
        }
    }

    match service.start_crawler(name).await {
        Ok(()) => {
            info!(crawler = %name, "crawler start accepted");
            Ok((StartOutcome::Started, superseded))
        }
        Err(ServiceError::AlreadyRunning { .. }) => {
            info!(crawler = %name, "crawler reported already running");
            Ok((StartOutcome::AlreadyRunning, None))
        }
        Err(e) => Err(e),
    }
}

/// Handle a custom-resource `onEvent` invocation.
pub async fn handle_on_event(
    service: &dyn CrawlerService,
    event: &CustomResourceEvent,
) -> Result<OnEventResponse> {
    let crawler_name = event.crawler_name();
    let physical_resource_id = event.physical_resource_id_or(crawler_name);

    if event.request_type == RequestType::Delete {
        info!(physical_resource_id = %physical_resource_id, "delete request, nothing to stop");
        return Ok(OnEventResponse {
            physical_resource_id,
            data: Map::new(),
        });
    }

    let name = crawler_name.ok_or(Error::MissingCrawlerName)?;
    let (outcome, superseded) = start(service, name, event.request_type).await?;

    let mut data = Map::new();
    data.insert(CRAWLER_NAME_KEY.to_string(), Value::String(name.to_string()));
    data.insert(
        "StartOutcome".to_string(),
        Value::String(outcome.as_str().to_string()),
    );
    if let Some(started_at) = superseded {
        data.insert(
            SUPERSEDED_CRAWL_KEY.to_string(),
            Value::String(started_at.to_string()),
        );
    }

    Ok(OnEventResponse {
        physical_resource_id,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::state::{CrawlerSnapshot, CrawlerStatus, LastCrawl, LastCrawlStatus};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Crawler that flips to `RUNNING` when started.
    struct ScriptedCrawler {
        snapshot: Mutex<CrawlerSnapshot>,
        starts: Mutex<u32>,
        read_fails: bool,
    }

    impl ScriptedCrawler {
        fn new(snapshot: CrawlerSnapshot) -> Self {
            Self {
                snapshot: Mutex::new(snapshot),
                starts: Mutex::new(0),
                read_fails: false,
            }
        }

        fn starts(&self) -> u32 {
            *self.starts.lock().unwrap()
        }
    }

    #[async_trait]
    impl CrawlerService for ScriptedCrawler {
        async fn get_crawler(&self, _name: &str) -> std::result::Result<CrawlerSnapshot, ServiceError> {
            if self.read_fails {
                return Err(ServiceError::transient("throttled"));
            }
            Ok(self.snapshot.lock().unwrap().clone())
        }

        async fn start_crawler(&self, name: &str) -> std::result::Result<(), ServiceError> {
            let mut snapshot = self.snapshot.lock().unwrap();
            if snapshot.status != CrawlerStatus::Ready {
                return Err(ServiceError::AlreadyRunning {
                    name: name.to_string(),
                });
            }
            snapshot.status = CrawlerStatus::Running;
            *self.starts.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn succeeded() -> CrawlerSnapshot {
        CrawlerSnapshot {
            name: "apilogs".to_string(),
            status: CrawlerStatus::Ready,
            last_crawl: Some(LastCrawl {
                status: LastCrawlStatus::Succeeded,
                error_message: None,
                started_at: Some(1_700_000_000_000),
            }),
        }
    }

    #[tokio::test]
    async fn second_start_is_a_no_op() {
        let crawler = ScriptedCrawler::new(CrawlerSnapshot::never_run("apilogs"));

        let first = start_job(&crawler, "apilogs", RequestType::Create).await.unwrap();
        let second = start_job(&crawler, "apilogs", RequestType::Create).await.unwrap();

        assert_eq!(first, StartOutcome::Started);
        assert_eq!(second, StartOutcome::AlreadyRunning);
        assert_eq!(crawler.starts(), 1);
    }

    #[tokio::test]
    async fn duplicate_create_after_success_does_not_recrawl() {
        let crawler = ScriptedCrawler::new(succeeded());
        let outcome = start_job(&crawler, "apilogs", RequestType::Create).await.unwrap();
        assert_eq!(outcome, StartOutcome::AlreadySucceeded);
        assert_eq!(crawler.starts(), 0);
    }

    #[tokio::test]
    async fn update_recrawls_an_idle_crawler() {
        let crawler = ScriptedCrawler::new(succeeded());
        let outcome = start_job(&crawler, "apilogs", RequestType::Update).await.unwrap();
        assert_eq!(outcome, StartOutcome::Started);
        assert_eq!(crawler.starts(), 1);
    }

    #[tokio::test]
    async fn unreadable_state_still_attempts_start() {
        let mut crawler = ScriptedCrawler::new(CrawlerSnapshot::never_run("apilogs"));
        crawler.read_fails = true;
        let outcome = start_job(&crawler, "apilogs", RequestType::Create).await.unwrap();
        assert_eq!(outcome, StartOutcome::Started);
    }

    #[tokio::test]
    async fn delete_never_touches_the_crawler() {
        let crawler = ScriptedCrawler::new(CrawlerSnapshot::never_run("apilogs"));
        let mut event = CustomResourceEvent::new(RequestType::Delete, "apilogs");
        event.physical_resource_id = Some("crawler/apilogs".to_string());

        let response = handle_on_event(&crawler, &event).await.unwrap();

        assert_eq!(response.physical_resource_id, "crawler/apilogs");
        assert_eq!(crawler.starts(), 0);
    }

    #[tokio::test]
    async fn create_without_crawler_name_is_rejected() {
        let crawler = ScriptedCrawler::new(CrawlerSnapshot::never_run("apilogs"));
        let mut event = CustomResourceEvent::new(RequestType::Create, "x");
        event.resource_properties.crawler_name = None;

        let err = handle_on_event(&crawler, &event).await.unwrap_err();
        assert!(matches!(err, Error::MissingCrawlerName));
    }

    #[tokio::test]
    async fn create_reports_deterministic_physical_id() {
        let crawler = ScriptedCrawler::new(CrawlerSnapshot::never_run("apilogs"));
        let event = CustomResourceEvent::new(RequestType::Create, "apilogs");

        let first = handle_on_event(&crawler, &event).await.unwrap();
        let second = handle_on_event(&crawler, &event).await.unwrap();

        assert_eq!(first.physical_resource_id, "crawler/apilogs");
        assert_eq!(first.physical_resource_id, second.physical_resource_id);
        assert_eq!(first.data["StartOutcome"], "started");
        assert_eq!(second.data["StartOutcome"], "already-running");
        assert_eq!(crawler.starts(), 1);
    }

    #[tokio::test]
    async fn recrawl_records_the_superseded_run() {
        let crawler = ScriptedCrawler::new(succeeded());
        let mut event = CustomResourceEvent::new(RequestType::Update, "apilogs");
        event.physical_resource_id = Some("crawler/apilogs".to_string());

        let response = handle_on_event(&crawler, &event).await.unwrap();

        assert_eq!(response.data["StartOutcome"], "started");
        assert_eq!(response.data[SUPERSEDED_CRAWL_KEY], "1700000000000");
    }

    #[tokio::test]
    async fn first_crawl_has_nothing_to_supersede() {
        let crawler = ScriptedCrawler::new(CrawlerSnapshot::never_run("apilogs"));
        let event = CustomResourceEvent::new(RequestType::Create, "apilogs");

        let response = handle_on_event(&crawler, &event).await.unwrap();

        assert!(!response.data.contains_key(SUPERSEDED_CRAWL_KEY));
    }
}
