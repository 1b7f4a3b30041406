//! Glue crawler lifecycle behind a CloudFormation custom resource.
//!
//! - [`starter`] - `onEvent`: start the crawl once
//! - [`poller`] - `isComplete`: report whether the crawl has finished
//! - [`provider`] - model of the framework polling loop that drives both
//! - [`state`] - crawler observations and the job state machine
//! - [`service`] - seam to the crawler service
//! - [`custom_resource`] - event and response wire types

pub mod custom_resource;
pub mod poller;
pub mod provider;
pub mod service;
pub mod starter;
pub mod state;

pub use custom_resource::{
    CrawlerProperties, CustomResourceEvent, IsCompleteResponse, OnEventResponse, RequestType,
};
pub use poller::{check_status, check_status_after, handle_is_complete};
pub use provider::{drive_to_completion, DriveReport, JobAction, JobLifecycleRequest, PollSchedule};
pub use service::CrawlerService;
pub use starter::{handle_on_event, start_job, StartOutcome};
pub use state::{CrawlerSnapshot, CrawlerStatus, JobState, LastCrawl, LastCrawlStatus, StatusReport};
