//! `isComplete` side of the crawler lifecycle: report whether the crawl is done.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::crawler::custom_resource::{
    CustomResourceEvent, IsCompleteResponse, RequestType, CRAWLER_NAME_KEY, SUPERSEDED_CRAWL_KEY,
};
use crate::crawler::service::CrawlerService;
use crate::crawler::state::{JobState, StatusReport};
use crate::error::{Error, Result, ServiceError};

/// Query the crawler and map its state to a completion report.
///
/// Query failures that may clear up on their own are reported as pending so
/// the orchestrator's retry loop keeps going. Only a failed crawl or a
/// crawler that does not exist produce an error.
pub async fn check_status(service: &dyn CrawlerService, name: &str) -> StatusReport {
    check_status_after(service, name, None).await
}

/// [`check_status`] for a crawl started on top of the run that began at
/// `superseded` (epoch milliseconds).
///
/// Glue can keep reporting `READY` with the previous run's result for a short
/// while after a start is accepted. A finished run whose start time equals
/// `superseded` is that stale result and reports as pending.
pub async fn check_status_after(
    service: &dyn CrawlerService,
    name: &str,
    superseded: Option<i64>,
) -> StatusReport {
    let snapshot = match service.get_crawler(name).await {
        Ok(snapshot) => snapshot,
        Err(e @ ServiceError::NotFound { .. }) => {
            warn!(crawler = %name, error = %e, "crawler does not exist");
            return StatusReport::failed(e.to_string(), None);
        }
        Err(e) => {
            warn!(crawler = %name, error = %e, "crawler status query failed, reporting incomplete");
            return StatusReport::pending(None);
        }
    };

    let state = snapshot.job_state();
    info!(crawler = %name, state = %state, "crawler status checked");

    let last_started_at = snapshot.last_crawl.as_ref().and_then(|last| last.started_at);
    if state.is_terminal() && superseded.is_some() && last_started_at == superseded {
        info!(crawler = %name, "crawler still reports the superseded run, reporting incomplete");
        return StatusReport::pending(Some(JobState::Starting));
    }

    match &state {
        JobState::Succeeded => StatusReport::succeeded(),
        JobState::Failed { reason } => StatusReport::failed(reason.clone(), Some(state.clone())),
        _ => StatusReport::pending(Some(state.clone())),
    }
}

/// Handle a custom-resource `isComplete` invocation.
///
/// A permanent failure is returned as [`Error::PermanentJobFailure`] so the
/// provider framework fails the resource instead of polling on.
pub async fn handle_is_complete(
    service: &dyn CrawlerService,
    event: &CustomResourceEvent,
) -> Result<IsCompleteResponse> {
    if event.request_type == RequestType::Delete {
        return Ok(IsCompleteResponse {
            is_complete: true,
            data: Map::new(),
        });
    }

    let name = event.crawler_name().ok_or(Error::MissingCrawlerName)?;
    let superseded = event
        .data
        .get(SUPERSEDED_CRAWL_KEY)
        .and_then(Value::as_str)
        .and_then(|millis| millis.parse::<i64>().ok());
    let report = check_status_after(service, name, superseded).await;

    if let Some(reason) = report.error {
        return Err(Error::PermanentJobFailure {
            name: name.to_string(),
            reason,
        });
    }

    let mut data = Map::new();
    if report.complete {
        data.insert(CRAWLER_NAME_KEY.to_string(), Value::String(name.to_string()));
    }

    Ok(IsCompleteResponse {
        is_complete: report.complete,
        data,
    })
}
