//! `isComplete` handler for the crawler custom resource.
//!
//! Reports whether the crawl started by `onEvent` has finished. A crawl that
//! failed or was cancelled fails the invocation, which fails the resource;
//! status queries that error transiently report "not yet complete" so the
//! provider keeps polling.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

use apilogs_lambda_shared::{init_tracing, load_sdk_config, GlueCrawlerService};
use apilogs_lib::crawler::{
    handle_is_complete, CrawlerService, CustomResourceEvent, IsCompleteResponse,
};

/// Entry point used by the Lambda runtime.
pub async fn run() -> Result<(), Error> {
    init_tracing();

    let sdk_config = load_sdk_config().await;
    let service = GlueCrawlerService::new(&sdk_config);
    info!("crawler status checker initialized");

    let service = &service;
    lambda_runtime::run(service_fn(move |event| handler(service, event))).await
}

/// Lambda handler invoked on every poll.
pub async fn handler(
    service: &dyn CrawlerService,
    event: LambdaEvent<Value>,
) -> Result<IsCompleteResponse, Error> {
    let request_id = event.context.request_id.clone();

    let request: CustomResourceEvent = serde_json::from_value(event.payload).map_err(|e| {
        error!(request_id = %request_id, error = %e, "failed to parse custom resource event");
        Error::from(format!("Invalid custom resource event: {}", e))
    })?;

    let response = handle_is_complete(service, &request).await.map_err(|e| {
        error!(request_id = %request_id, error = %e, "isComplete failed");
        Error::from(e)
    })?;

    info!(
        request_id = %request_id,
        request_type = ?request.request_type,
        physical_resource_id = request.physical_resource_id.as_deref().unwrap_or("-"),
        is_complete = response.is_complete,
        "isComplete checked"
    );

    Ok(response)
}
