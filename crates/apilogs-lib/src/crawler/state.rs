//! Crawler observations and the job state machine derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Crawler lifecycle state as reported by Glue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrawlerStatus {
    Ready,
    Running,
    /// Crawl finished or cancelled, resources being released.
    Stopping,
}

/// Outcome of the most recent crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LastCrawlStatus {
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCrawl {
    pub status: LastCrawlStatus,
    pub error_message: Option<String>,
    /// Start of the crawl, epoch milliseconds. Identifies the crawl run.
    #[serde(default)]
    pub started_at: Option<i64>,
}

/// Point-in-time view of a crawler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerSnapshot {
    pub name: String,
    pub status: CrawlerStatus,
    pub last_crawl: Option<LastCrawl>,
}

impl CrawlerSnapshot {
    /// A crawler that has never run.
    pub fn never_run(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CrawlerStatus::Ready,
            last_crawl: None,
        }
    }

    /// Map the Glue view onto the job state machine.
    ///
    /// `STOPPING` is still `Running`: the final crawl status is only
    /// reliable once the crawler is back to `READY`.
    pub fn job_state(&self) -> JobState {
        match (self.status, &self.last_crawl) {
            (CrawlerStatus::Running | CrawlerStatus::Stopping, _) => JobState::Running,
            (CrawlerStatus::Ready, None) => JobState::NotStarted,
            (CrawlerStatus::Ready, Some(last)) => match last.status {
                LastCrawlStatus::Succeeded => JobState::Succeeded,
                LastCrawlStatus::Failed | LastCrawlStatus::Cancelled => JobState::Failed {
                    reason: last
                        .error_message
                        .clone()
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| format!("last crawl {}", last.status.as_str())),
                },
            },
        }
    }
}

impl LastCrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LastCrawlStatus::Succeeded => "SUCCEEDED",
            LastCrawlStatus::Failed => "FAILED",
            LastCrawlStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Job lifecycle as seen by the controller.
///
/// `NotStarted -> Starting -> Running -> Succeeded | Failed`; `TimedOut` is
/// imposed by the orchestrator, never observed from the crawler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    NotStarted,
    Starting,
    Running,
    Succeeded,
    Failed { reason: String },
    TimedOut,
}

impl JobState {
    /// True once no further transitions are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed { .. } | JobState::TimedOut
        )
    }

    /// True while the job is underway and must not be started again.
    pub fn is_underway(&self) -> bool {
        matches!(self, JobState::Starting | JobState::Running)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::NotStarted => write!(f, "not started"),
            JobState::Starting => write!(f, "starting"),
            JobState::Running => write!(f, "running"),
            JobState::Succeeded => write!(f, "succeeded"),
            JobState::Failed { reason } => write!(f, "failed: {}", reason),
            JobState::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Answer to "is the job done yet?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub complete: bool,
    /// Set only for permanent failures.
    pub error: Option<String>,
    /// Observed state, when the query succeeded.
    pub state: Option<JobState>,
}

impl StatusReport {
    /// Soft "not yet" answer; the orchestrator keeps polling.
    pub fn pending(state: Option<JobState>) -> Self {
        Self {
            complete: false,
            error: None,
            state,
        }
    }

    pub fn succeeded() -> Self {
        Self {
            complete: true,
            error: None,
            state: Some(JobState::Succeeded),
        }
    }

    pub fn failed(reason: impl Into<String>, state: Option<JobState>) -> Self {
        Self {
            complete: true,
            error: Some(reason.into()),
            state,
        }
    }
}
