//! Firehose data-transformation Lambda for API Gateway access logs.
//!
//! Each invocation receives a batch of base64 access-log records and returns
//! one outcome per record, with `year`/`month`/`day`/`hour` partition keys
//! for dynamic partitioning. Record-level failures never fail the batch; only
//! an event that cannot be parsed at all is returned as an error, which makes
//! Firehose retry the whole invocation.

use std::time::Instant;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

use apilogs_lambda_shared::{
    init_tracing, load_sdk_config, ApiGatewayKeyDirectory, EnricherConfig,
};
use apilogs_lib::firehose::{
    ApiKeyDirectory, FirehoseEvent, FirehoseResponse, RecordProcessor, RecordResult,
};

/// State built once per cold start and shared by every invocation.
pub struct EnricherState {
    config: EnricherConfig,
    directory: Option<Box<dyn ApiKeyDirectory>>,
}

impl EnricherState {
    pub fn new(config: EnricherConfig, directory: Option<Box<dyn ApiKeyDirectory>>) -> Self {
        Self { config, directory }
    }

    pub fn config(&self) -> &EnricherConfig {
        &self.config
    }

    /// A processor for one invocation.
    pub fn processor(&self) -> RecordProcessor<'_> {
        let processor = RecordProcessor::new(self.config.processor_config());
        match &self.directory {
            Some(directory) => processor.with_directory(directory.as_ref()),
            None => processor,
        }
    }
}

/// Entry point used by the Lambda runtime.
pub async fn run() -> Result<(), Error> {
    init_tracing();

    let config = EnricherConfig::from_env();
    let directory: Option<Box<dyn ApiKeyDirectory>> = if config.enrich_api_keys {
        let sdk_config = load_sdk_config().await;
        Some(Box::new(ApiGatewayKeyDirectory::new(&sdk_config)))
    } else {
        None
    };

    info!(
        response_ceiling_bytes = config.response_ceiling,
        enrich_api_keys = config.enrich_api_keys,
        "enricher initialized"
    );

    let state = EnricherState::new(config, directory);
    let state = &state;
    lambda_runtime::run(service_fn(move |event| handler(state, event))).await
}

/// Lambda handler invoked per batch.
pub async fn handler(
    state: &EnricherState,
    event: LambdaEvent<Value>,
) -> Result<FirehoseResponse, Error> {
    let request_id = event.context.request_id.clone();

    let batch: FirehoseEvent = match serde_json::from_value(event.payload) {
        Ok(batch) => batch,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "failed to parse Firehose event");
            return Err(Error::from(format!("Invalid Firehose event: {}", e)));
        }
    };

    info!(
        request_id = %request_id,
        invocation_id = %batch.invocation_id,
        record_count = batch.records.len(),
        "handling Firehose transformation"
    );

    let start = Instant::now();
    let response = state.processor().process(&batch).await;

    info!(
        request_id = %request_id,
        invocation_id = %batch.invocation_id,
        ok = response.count(RecordResult::Ok),
        processing_failed = response.count(RecordResult::ProcessingFailed),
        dropped = response.count(RecordResult::Dropped),
        response_bytes = response.encoded_len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Firehose transformation complete"
    );

    Ok(response)
}
