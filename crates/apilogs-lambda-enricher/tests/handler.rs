//! Invocation-level tests for the enricher Lambda.

use apilogs_lambda_enricher::{handler, EnricherState};
use apilogs_lambda_shared::test_utils::{firehose_event, lambda_event, StaticApiKeyDirectory};
use apilogs_lambda_shared::EnricherConfig;
use apilogs_lib::firehose::codec::decode_data;
use apilogs_lib::firehose::{ApiKeyDirectory, RecordResult};
use serde_json::{json, Value};

fn state_with_keys() -> EnricherState {
    let directory: Box<dyn ApiKeyDirectory> = Box::new(
        StaticApiKeyDirectory::default().with_key("k-123", "partner-a", "Partner A production key"),
    );
    EnricherState::new(EnricherConfig::default(), Some(directory))
}

fn decoded(data: &str) -> Value {
    serde_json::from_slice(&decode_data(data).expect("valid base64")).expect("valid json")
}

#[tokio::test]
async fn enriches_and_partitions_access_log_records() {
    let batch = firehose_event(&[
        r#"{"requestId":"r-1","apiId":"a1b2c3","identity.apiKeyId":"k-123","stage":"prod","ts":1700000000}"#,
    ]);

    let response = handler(&state_with_keys(), lambda_event(&batch))
        .await
        .expect("handler succeeds");

    let record = &response.records[0];
    assert_eq!(record.record_id, "record-0000");
    assert_eq!(record.result, RecordResult::Ok);

    let key = record.partition_key().expect("partition keys present");
    assert_eq!(
        key.pairs(),
        [("year", "2023"), ("month", "11"), ("day", "14"), ("hour", "22")]
    );

    let payload = decoded(&record.data);
    assert_eq!(payload["requestId"], "r-1");
    assert_eq!(payload["identity.apiKeyName"], "partner-a");
    assert_eq!(payload["identity.apiKeyDescription"], "Partner A production key");
}

#[tokio::test]
async fn response_serializes_in_firehose_wire_format() {
    let batch = firehose_event(&[r#"{"ts":1700000000}"#, "   ", "{oops"]);

    let response = handler(&state_with_keys(), lambda_event(&batch))
        .await
        .expect("handler succeeds");
    let wire = serde_json::to_value(&response).expect("serializable");

    assert_eq!(wire["records"][0]["recordId"], "record-0000");
    assert_eq!(wire["records"][0]["result"], "Ok");
    assert_eq!(wire["records"][0]["metadata"]["partitionKeys"]["hour"], "22");
    assert_eq!(wire["records"][1]["result"], "Dropped");
    assert_eq!(wire["records"][2]["result"], "ProcessingFailed");
}

#[tokio::test]
async fn event_without_invocation_id_is_rejected() {
    let result = handler(
        &state_with_keys(),
        lambda_event(json!({ "records": [] })),
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn lookups_disabled_leaves_payload_untouched() {
    let state = EnricherState::new(EnricherConfig::default(), None);
    let batch = firehose_event(&[r#"{"identity.apiKeyId":"k-123","ts":1700000000}"#]);

    let response = handler(&state, lambda_event(&batch)).await.expect("handler succeeds");

    assert_eq!(response.records[0].result, RecordResult::Ok);
    assert_eq!(response.records[0].data, batch.records[0].data);
}
