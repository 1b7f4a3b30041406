//! Response size accounting against the delivery ceiling.

use crate::firehose::model::FirehoseResponseRecord;

/// Firehose rejects transformation responses above 6 MiB.
pub const DEFAULT_RESPONSE_CEILING: usize = 6 * 1024 * 1024;

/// `{"records":[` + `]}`
const ENVELOPE_LEN: usize = 14;

/// Encoded size of a single response record.
pub fn record_len(record: &FirehoseResponseRecord) -> usize {
    serde_json::to_vec(record)
        .map(|v| v.len())
        .unwrap_or(usize::MAX)
}

/// Size of a response envelope holding `count` records of `records_len`
/// total bytes.
pub fn response_len(count: usize, records_len: usize) -> usize {
    ENVELOPE_LEN + records_len + count.saturating_sub(1)
}

/// Remaining byte budget for a response under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseBudget {
    remaining: usize,
    overdrawn: bool,
}

impl ResponseBudget {
    /// Budget left over once `reserved` bytes are committed under `ceiling`.
    pub fn new(ceiling: usize, reserved: usize) -> Self {
        Self {
            remaining: ceiling.saturating_sub(reserved),
            overdrawn: reserved > ceiling,
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// True when the reservation alone already exceeded the ceiling.
    pub fn is_overdrawn(&self) -> bool {
        self.overdrawn
    }

    /// Spend `cost` bytes if they fit.
    pub fn try_spend(&mut self, cost: usize) -> bool {
        if cost <= self.remaining {
            self.remaining -= cost;
            true
        } else {
            false
        }
    }
}
