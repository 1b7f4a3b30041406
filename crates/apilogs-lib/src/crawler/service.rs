//! Seam to the external crawler service.

use async_trait::async_trait;

use crate::crawler::state::CrawlerSnapshot;
use crate::error::ServiceError;

/// Operations the lifecycle controller needs from the crawler service.
///
/// Implementations must map "crawl already in progress" rejections to
/// [`ServiceError::AlreadyRunning`] and missing crawlers to
/// [`ServiceError::NotFound`]; everything else is treated as transient.
#[async_trait]
pub trait CrawlerService: Send + Sync {
    /// Current state of the named crawler.
    async fn get_crawler(&self, name: &str) -> Result<CrawlerSnapshot, ServiceError>;

    /// Ask the service to begin a crawl. Returns once the request is accepted.
    async fn start_crawler(&self, name: &str) -> Result<(), ServiceError>;
}
