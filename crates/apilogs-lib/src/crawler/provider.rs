//! Model of the provisioning framework that drives the lifecycle handlers.
//!
//! The deployed framework invokes `onEvent` once, then `isComplete` every
//! [`PollSchedule::interval`] until it reports completion, fails, or
//! [`PollSchedule::total_timeout`] elapses. The handlers keep no timers or
//! counters of their own; all of that bookkeeping lives here.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::crawler::custom_resource::CustomResourceEvent;
use crate::crawler::poller::handle_is_complete;
use crate::crawler::service::CrawlerService;
use crate::crawler::starter::handle_on_event;
use crate::crawler::state::JobState;
use crate::error::{Error, Result};

/// Interval between completion checks, as deployed.
pub const DEFAULT_QUERY_INTERVAL: Duration = Duration::from_secs(15);
/// Overall completion budget, as deployed.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobAction {
    Start,
    CheckStatus,
}

/// One call the orchestrator makes into the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLifecycleRequest {
    pub job_id: String,
    pub action: JobAction,
    /// 1-based attempt number for this action.
    pub attempt: u32,
    /// Point after which the orchestrator gives up.
    pub deadline: Instant,
}

/// Fixed-interval polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub total_timeout: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval: DEFAULT_QUERY_INTERVAL,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
        }
    }
}

impl PollSchedule {
    /// Completion checks made before giving up: `total_timeout / interval`,
    /// at least one.
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let checks = self.total_timeout.as_nanos() / self.interval.as_nanos();
        u32::try_from(checks).unwrap_or(u32::MAX).max(1)
    }
}

/// How a driven lifecycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveReport {
    pub job_id: String,
    /// `Succeeded`, `Failed` or `TimedOut`.
    pub state: JobState,
    /// Completion checks performed.
    pub attempts: u32,
}

impl DriveReport {
    /// Convert into the error the orchestrator surfaces to its own caller.
    pub fn into_result(self) -> Result<u32> {
        match self.state {
            JobState::Succeeded => Ok(self.attempts),
            JobState::Failed { reason } => Err(Error::PermanentJobFailure {
                name: self.job_id,
                reason,
            }),
            _ => Err(Error::JobTimedOut {
                name: self.job_id,
                attempts: self.attempts,
            }),
        }
    }
}

/// Run `onEvent` followed by `isComplete` polling under `schedule`.
///
/// At most [`PollSchedule::max_attempts`] checks are made, `interval` apart.
///
/// Errors from `onEvent` (a start that was rejected outright, a missing
/// crawler name) are returned as-is; everything observed after that is
/// reported through [`DriveReport`].
pub async fn drive_to_completion(
    service: &dyn CrawlerService,
    event: &CustomResourceEvent,
    schedule: PollSchedule,
) -> Result<DriveReport> {
    let started_at = Instant::now();
    let deadline = started_at + schedule.total_timeout;

    let start = JobLifecycleRequest {
        job_id: event.crawler_name().unwrap_or_default().to_string(),
        action: JobAction::Start,
        attempt: 1,
        deadline,
    };
    debug!(request = ?start, "invoking onEvent");

    let created = handle_on_event(service, event).await?;
    let job_id = start.job_id;

    let mut poll_event = event.clone();
    poll_event.physical_resource_id = Some(created.physical_resource_id);
    poll_event.data = created.data;

    let max_attempts = schedule.max_attempts();
    let mut attempt = 0;
    loop {
        attempt += 1;
        let request = JobLifecycleRequest {
            job_id: job_id.clone(),
            action: JobAction::CheckStatus,
            attempt,
            deadline,
        };
        debug!(request = ?request, "invoking isComplete");

        match handle_is_complete(service, &poll_event).await {
            Ok(response) if response.is_complete => {
                info!(job_id = %job_id, attempts = attempt, "lifecycle complete");
                return Ok(DriveReport {
                    job_id,
                    state: JobState::Succeeded,
                    attempts: attempt,
                });
            }
            Ok(_) => {}
            Err(Error::PermanentJobFailure { reason, .. }) => {
                warn!(job_id = %job_id, attempts = attempt, reason = %reason, "lifecycle failed");
                return Ok(DriveReport {
                    job_id,
                    state: JobState::Failed { reason },
                    attempts: attempt,
                });
            }
            Err(e) => return Err(e),
        }

        if attempt >= max_attempts {
            warn!(
                job_id = %job_id,
                attempts = attempt,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "lifecycle timed out"
            );
            return Ok(DriveReport {
                job_id,
                state: JobState::TimedOut,
                attempts: attempt,
            });
        }

        sleep(schedule.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_matches_deployment() {
        let schedule = PollSchedule::default();
        assert_eq!(schedule.interval, Duration::from_secs(15));
        assert_eq!(schedule.total_timeout, Duration::from_secs(300));
        assert_eq!(schedule.max_attempts(), 20);
    }

    #[test]
    fn zero_interval_allows_a_single_check() {
        let schedule = PollSchedule {
            interval: Duration::ZERO,
            total_timeout: Duration::from_secs(1),
        };
        assert_eq!(schedule.max_attempts(), 1);
    }

    #[test]
    fn report_converts_to_orchestrator_errors() {
        let timed_out = DriveReport {
            job_id: "apilogs".to_string(),
            state: JobState::TimedOut,
            attempts: 20,
        };
        assert!(matches!(
            timed_out.into_result(),
            Err(Error::JobTimedOut { attempts: 20, .. })
        ));

        let succeeded = DriveReport {
            job_id: "apilogs".to_string(),
            state: JobState::Succeeded,
            attempts: 3,
        };
        assert_eq!(succeeded.into_result().unwrap(), 3);
    }
}
