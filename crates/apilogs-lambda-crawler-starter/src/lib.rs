//! `onEvent` handler for the crawler custom resource.
//!
//! Starts the Glue crawler named by the resource's `crawlerName` property
//! and returns immediately; the companion status Lambda reports when the
//! crawl is done. Calling it again while a crawl is underway is a no-op.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

use apilogs_lambda_shared::{init_tracing, load_sdk_config, GlueCrawlerService};
use apilogs_lib::crawler::{handle_on_event, CrawlerService, CustomResourceEvent, OnEventResponse};

/// Entry point used by the Lambda runtime.
pub async fn run() -> Result<(), Error> {
    init_tracing();

    let sdk_config = load_sdk_config().await;
    let service = GlueCrawlerService::new(&sdk_config);
    info!("crawler starter initialized");

    let service = &service;
    lambda_runtime::run(service_fn(move |event| handler(service, event))).await
}

/// Lambda handler invoked once per lifecycle event.
pub async fn handler(
    service: &dyn CrawlerService,
    event: LambdaEvent<Value>,
) -> Result<OnEventResponse, Error> {
    let request_id = event.context.request_id.clone();

    let request: CustomResourceEvent = match serde_json::from_value(event.payload) {
        Ok(request) => request,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "failed to parse custom resource event");
            return Err(Error::from(format!("Invalid custom resource event: {}", e)));
        }
    };

    info!(
        request_id = %request_id,
        request_type = ?request.request_type,
        crawler = request.crawler_name().unwrap_or("-"),
        "handling onEvent"
    );

    match handle_on_event(service, &request).await {
        Ok(response) => {
            info!(
                request_id = %request_id,
                physical_resource_id = %response.physical_resource_id,
                "onEvent complete"
            );
            Ok(response)
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "onEvent failed");
            Err(e.into())
        }
    }
}
