//! Wire types for the Firehose data-transformation contract.
//!
//! Record data stays a plain base64 `String` on the way in so that a single
//! malformed record surfaces as a per-record failure instead of failing the
//! whole event deserialization.

use serde::{Deserialize, Serialize};

use crate::firehose::partition::PartitionKey;

/// A batch of records handed to the transformation Lambda.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirehoseEvent {
    /// Unique id of this invocation, assigned by Firehose.
    pub invocation_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_stream_arn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Records in arrival order.
    #[serde(default)]
    pub records: Vec<FirehoseRecord>,
}

/// A single access-log record as delivered by Firehose.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirehoseRecord {
    /// Correlates this record with its outcome.
    pub record_id: String,

    /// Arrival time at the stream, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approximate_arrival_timestamp: Option<i64>,

    /// Base64-encoded payload.
    pub data: String,
}

/// Processing result reported back to Firehose for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordResult {
    /// Record transformed and ready for delivery.
    Ok,
    /// Record intentionally discarded.
    Dropped,
    /// Record could not be transformed; Firehose writes it to the error prefix.
    ProcessingFailed,
}

/// Dynamic-partitioning metadata attached to a delivered record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub partition_keys: PartitionKey,
}

/// Outcome for one record in the transformation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirehoseResponseRecord {
    pub record_id: String,
    pub result: RecordResult,
    /// Base64-encoded payload; empty for failed and dropped records.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,
}

impl FirehoseResponseRecord {
    /// Successful outcome carrying the transformed payload and its partition key.
    pub fn delivered(record_id: impl Into<String>, data: String, key: PartitionKey) -> Self {
        Self {
            record_id: record_id.into(),
            result: RecordResult::Ok,
            data,
            metadata: Some(RecordMetadata {
                partition_keys: key,
            }),
        }
    }

    /// Failed outcome. Carries no data so its footprint in the response is fixed.
    pub fn failed(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            result: RecordResult::ProcessingFailed,
            data: String::new(),
            metadata: None,
        }
    }

    pub fn dropped(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            result: RecordResult::Dropped,
            data: String::new(),
            metadata: None,
        }
    }

    /// Partition key of a delivered record.
    pub fn partition_key(&self) -> Option<&PartitionKey> {
        self.metadata.as_ref().map(|m| &m.partition_keys)
    }
}

/// Response returned to Firehose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirehoseResponse {
    pub records: Vec<FirehoseResponseRecord>,
}

impl FirehoseResponse {
    /// Number of records with the given result.
    pub fn count(&self, result: RecordResult) -> usize {
        self.records.iter().filter(|r| r.result == result).count()
    }

    /// Size in bytes of the JSON encoding Firehose will receive.
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_firehose_event_with_optional_fields_missing() {
        let event: FirehoseEvent = serde_json::from_value(json!({
            "invocationId": "inv-1",
            "records": [{ "recordId": "1", "data": "e30=" }]
        }))
        .unwrap();

        assert_eq!(event.invocation_id, "inv-1");
        assert_eq!(event.records.len(), 1);
        assert!(event.records[0].approximate_arrival_timestamp.is_none());
    }

    #[test]
    fn delivered_record_serializes_partition_keys_as_metadata() {
        let key = PartitionKey {
            year: "2024".to_string(),
            month: "03".to_string(),
            day: "07".to_string(),
            hour: "09".to_string(),
        };
        let record = FirehoseResponseRecord::delivered("abc", "e30=".to_string(), key);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["recordId"], "abc");
        assert_eq!(value["result"], "Ok");
        assert_eq!(value["metadata"]["partitionKeys"]["month"], "03");
        assert_eq!(value["metadata"]["partitionKeys"]["hour"], "09");
    }

    #[test]
    fn failed_record_omits_metadata() {
        let value = serde_json::to_value(FirehoseResponseRecord::failed("x")).unwrap();
        assert_eq!(value["result"], "ProcessingFailed");
        assert_eq!(value["data"], "");
        assert!(value.get("metadata").is_none());
    }
}
