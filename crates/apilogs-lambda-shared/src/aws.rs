//! AWS SDK adapters for the service seams defined in `apilogs-lib`.
//!
//! Clients are built once per cold start and reused across invocations.
//! They hold connection pools only; no job or batch state lives here.

use std::time::Instant;

use async_trait::async_trait;
use aws_sdk_apigateway::operation::get_api_key::GetApiKeyError;
use aws_sdk_glue::error::{DisplayErrorContext, SdkError};
use aws_sdk_glue::operation::get_crawler::GetCrawlerError;
use aws_sdk_glue::operation::start_crawler::StartCrawlerError;
use aws_sdk_glue::types::{CrawlerState, LastCrawlStatus as GlueLastCrawlStatus};
use tracing::info;

use apilogs_lib::crawler::{
    CrawlerService, CrawlerSnapshot, CrawlerStatus, LastCrawl, LastCrawlStatus,
};
use apilogs_lib::firehose::{ApiKeyDetails, ApiKeyDirectory};
use apilogs_lib::ServiceError;

/// Load the shared SDK configuration from the Lambda environment.
pub async fn load_sdk_config() -> aws_config::SdkConfig {
    let start = Instant::now();
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    info!(
        region = ?config.region(),
        sdk_config_ms = start.elapsed().as_millis() as u64,
        "AWS SDK configuration loaded"
    );
    config
}

/// [`CrawlerService`] backed by AWS Glue.
#[derive(Debug, Clone)]
pub struct GlueCrawlerService {
    client: aws_sdk_glue::Client,
}

impl GlueCrawlerService {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_glue::Client::new(config),
        }
    }
}

#[async_trait]
impl CrawlerService for GlueCrawlerService {
    async fn get_crawler(&self, name: &str) -> Result<CrawlerSnapshot, ServiceError> {
        let output = self
            .client
            .get_crawler()
            .name(name)
            .send()
            .await
            .map_err(|e| get_crawler_error(name, e))?;

        let crawler = output.crawler().ok_or_else(|| ServiceError::NotFound {
            kind: "crawler",
            name: name.to_string(),
        })?;

        let status = match crawler.state() {
            Some(CrawlerState::Running) => CrawlerStatus::Running,
            Some(CrawlerState::Stopping) => CrawlerStatus::Stopping,
            _ => CrawlerStatus::Ready,
        };

        let last_crawl = crawler.last_crawl().and_then(|info| {
            let status = match info.status()? {
                GlueLastCrawlStatus::Succeeded => LastCrawlStatus::Succeeded,
                GlueLastCrawlStatus::Cancelled => LastCrawlStatus::Cancelled,
                _ => LastCrawlStatus::Failed,
            };
            Some(LastCrawl {
                status,
                error_message: info.error_message().map(str::to_string),
                started_at: info.start_time().and_then(|t| t.to_millis().ok()),
            })
        });

        Ok(CrawlerSnapshot {
            name: name.to_string(),
            status,
            last_crawl,
        })
    }

    async fn start_crawler(&self, name: &str) -> Result<(), ServiceError> {
        self.client
            .start_crawler()
            .name(name)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| start_crawler_error(name, e))
    }
}

fn get_crawler_error<R>(name: &str, err: SdkError<GetCrawlerError, R>) -> ServiceError
where
    R: std::fmt::Debug,
{
    match err.as_service_error() {
        Some(e) if e.is_entity_not_found_exception() => ServiceError::NotFound {
            kind: "crawler",
            name: name.to_string(),
        },
        _ => ServiceError::transient(DisplayErrorContext(&err).to_string()),
    }
}

fn start_crawler_error<R>(name: &str, err: SdkError<StartCrawlerError, R>) -> ServiceError
where
    R: std::fmt::Debug,
{
    match err.as_service_error() {
        Some(e) if e.is_crawler_running_exception() => ServiceError::AlreadyRunning {
            name: name.to_string(),
        },
        Some(e) if e.is_entity_not_found_exception() => ServiceError::NotFound {
            kind: "crawler",
            name: name.to_string(),
        },
        _ => ServiceError::transient(DisplayErrorContext(&err).to_string()),
    }
}

/// [`ApiKeyDirectory`] backed by API Gateway `GetApiKey`.
#[derive(Debug, Clone)]
pub struct ApiGatewayKeyDirectory {
    client: aws_sdk_apigateway::Client,
}

impl ApiGatewayKeyDirectory {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_apigateway::Client::new(config),
        }
    }
}

#[async_trait]
impl ApiKeyDirectory for ApiGatewayKeyDirectory {
    async fn lookup(&self, key_id: &str) -> Result<ApiKeyDetails, ServiceError> {
        let output = self
            .client
            .get_api_key()
            .api_key(key_id)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(GetApiKeyError::NotFoundException(_)) => ServiceError::NotFound {
                    kind: "api key",
                    name: key_id.to_string(),
                },
                _ => ServiceError::transient(
                    aws_sdk_apigateway::error::DisplayErrorContext(&err).to_string(),
                ),
            })?;

        Ok(ApiKeyDetails {
            name: output.name().map(str::to_string),
            description: output.description().map(str::to_string),
        })
    }
}
