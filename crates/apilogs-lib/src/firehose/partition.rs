//! Partition keys for Firehose dynamic partitioning.
//!
//! The key names must match the `!{partitionKeyFromLambda:...}` placeholders
//! in the delivery stream prefix exactly.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RecordError;

/// Payload fields consulted for the record timestamp, in priority order.
pub const TIMESTAMP_FIELDS: [&str; 4] = ["ts", "requestTimeEpoch", "timestamp", "requestTime"];

/// Epoch values at or above this magnitude are read as milliseconds.
/// 10^11 seconds is year 5138, 10^11 milliseconds is March 1973.
const MILLIS_THRESHOLD: u64 = 100_000_000_000;

/// API Gateway `$context.requestTime` layout (CLF).
const CLF_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// UTC calendar breakdown of a record timestamp, zero-padded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
}

impl PartitionKey {
    /// Build a key from a UTC instant.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            year: format!("{:04}", at.year()),
            month: format!("{:02}", at.month()),
            day: format!("{:02}", at.day()),
            hour: format!("{:02}", at.hour()),
        }
    }

    /// Build a key from epoch seconds.
    pub fn from_epoch_seconds(seconds: i64) -> Result<Self, RecordError> {
        DateTime::<Utc>::from_timestamp(seconds, 0)
            .map(Self::from_datetime)
            .ok_or_else(|| RecordError::TimestampOutOfRange(seconds.to_string()))
    }

    /// Build a key from epoch milliseconds.
    pub fn from_epoch_millis(millis: i64) -> Result<Self, RecordError> {
        DateTime::<Utc>::from_timestamp_millis(millis)
            .map(Self::from_datetime)
            .ok_or_else(|| RecordError::TimestampOutOfRange(millis.to_string()))
    }

    /// Build a key from an epoch value whose unit is inferred from its magnitude.
    pub fn from_epoch(value: i64) -> Result<Self, RecordError> {
        if value.unsigned_abs() >= MILLIS_THRESHOLD {
            Self::from_epoch_millis(value)
        } else {
            Self::from_epoch_seconds(value)
        }
    }

    /// Derive the key for a parsed log entry.
    ///
    /// The first field of [`TIMESTAMP_FIELDS`] present in `payload` wins. When
    /// none is present, `arrival_millis` (the record's arrival timestamp) is
    /// used instead.
    pub fn for_payload(
        payload: &Map<String, Value>,
        arrival_millis: Option<i64>,
    ) -> Result<Self, RecordError> {
        let field = TIMESTAMP_FIELDS
            .iter()
            .find_map(|name| payload.get(*name).filter(|v| !v.is_null()));

        match (field, arrival_millis) {
            (Some(value), _) => Self::from_value(value),
            (None, Some(millis)) => Self::from_epoch_millis(millis),
            (None, None) => Err(RecordError::MissingTimestamp),
        }
    }

    /// As `[("year", ..), ("month", ..), ..]`, in prefix order.
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("year", self.year.as_str()),
            ("month", self.month.as_str()),
            ("day", self.day.as_str()),
            ("hour", self.hour.as_str()),
        ]
    }

    fn from_value(value: &Value) -> Result<Self, RecordError> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::from_epoch(i)
                } else {
                    n.as_f64()
                        .and_then(float_to_epoch)
                        .ok_or_else(|| RecordError::TimestampOutOfRange(n.to_string()))
                        .and_then(Self::from_epoch)
                }
            }
            Value::String(s) => Self::from_text(s.trim()),
            other => Err(RecordError::TimestampOutOfRange(other.to_string())),
        }
    }

    fn from_text(text: &str) -> Result<Self, RecordError> {
        if let Ok(i) = text.parse::<i64>() {
            return Self::from_epoch(i);
        }
        if let Some(epoch) = text.parse::<f64>().ok().and_then(float_to_epoch) {
            return Self::from_epoch(epoch);
        }
        if let Ok(at) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self::from_datetime(at.with_timezone(&Utc)));
        }
        if let Ok(at) = DateTime::parse_from_str(text, CLF_FORMAT) {
            return Ok(Self::from_datetime(at.with_timezone(&Utc)));
        }
        Err(RecordError::TimestampOutOfRange(text.to_string()))
    }
}

fn float_to_epoch(value: f64) -> Option<i64> {
    if value.is_finite() && value.abs() < i64::MAX as f64 {
        Some(value.floor() as i64)
    } else {
        None
    }
}
