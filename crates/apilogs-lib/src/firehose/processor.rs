//! Batch transformation: decode, parse, partition, enrich, re-encode.
//!
//! Processing is a pure function of the batch and of the API key directory
//! contents, so Firehose redelivering a batch yields identical output.

use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::error::RecordError;
use crate::firehose::codec::{decode_data, encode_data};
use crate::firehose::enrich::{ApiKeyDirectory, Enricher};
use crate::firehose::model::{
    FirehoseEvent, FirehoseRecord, FirehoseResponse, FirehoseResponseRecord,
};
use crate::firehose::partition::PartitionKey;
use crate::firehose::sizing::{
    record_len, response_len, ResponseBudget, DEFAULT_RESPONSE_CEILING,
};

/// Tunables for the record processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Maximum encoded size of the whole response.
    pub response_ceiling: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            response_ceiling: DEFAULT_RESPONSE_CEILING,
        }
    }
}

/// What a single record turned into before size accounting.
#[derive(Debug)]
enum Candidate {
    Deliver {
        key: PartitionKey,
        /// Base64 payload with additions; `None` when nothing was added.
        enriched: Option<String>,
        /// Base64 payload exactly as received.
        original: String,
    },
    Drop,
    Fail,
}

/// Transforms Firehose batches of API Gateway access logs.
pub struct RecordProcessor<'a> {
    config: ProcessorConfig,
    directory: Option<&'a dyn ApiKeyDirectory>,
}

impl<'a> RecordProcessor<'a> {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            config,
            directory: None,
        }
    }

    /// Resolve API key names and descriptions through `directory`.
    pub fn with_directory(mut self, directory: &'a dyn ApiKeyDirectory) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Process a batch, producing exactly one outcome per input record, in
    /// input order.
    pub async fn process(&self, event: &FirehoseEvent) -> FirehoseResponse {
        let mut enricher = Enricher::new(self.directory);
        let mut candidates = Vec::with_capacity(event.records.len());
        for record in &event.records {
            let candidate = match transform(record, &mut enricher).await {
                Ok(Some(candidate)) => candidate,
                Ok(None) => Candidate::Drop,
                Err(e) => {
                    warn!(
                        invocation_id = %event.invocation_id,
                        record_id = %record.record_id,
                        error = %e,
                        "record processing failed"
                    );
                    Candidate::Fail
                }
            };
            candidates.push(candidate);
        }

        self.fit_to_ceiling(event, candidates)
    }

    /// Turn candidates into outcomes whose combined encoding stays within the
    /// response ceiling.
    ///
    /// Every record first reserves the footprint of its cheapest outcome (a
    /// data-less stub). Deliverable records are then upgraded in input order:
    /// enriched payload if it fits, else the original payload, else the
    /// record stays `ProcessingFailed`.
    fn fit_to_ceiling(&self, event: &FirehoseEvent, candidates: Vec<Candidate>) -> FirehoseResponse {
        let stubs: Vec<FirehoseResponseRecord> = event
            .records
            .iter()
            .zip(&candidates)
            .map(|(record, candidate)| match candidate {
                Candidate::Drop => FirehoseResponseRecord::dropped(&record.record_id),
                _ => FirehoseResponseRecord::failed(&record.record_id),
            })
            .collect();

        let stub_lens: Vec<usize> = stubs.iter().map(record_len).collect();
        let reserved = response_len(stubs.len(), stub_lens.iter().sum());
        let mut budget = ResponseBudget::new(self.config.response_ceiling, reserved);

        if budget.is_overdrawn() {
            error!(
                invocation_id = %event.invocation_id,
                reserved_bytes = reserved,
                ceiling_bytes = self.config.response_ceiling,
                "batch cannot fit under the response ceiling even with every record failed"
            );
        }

        let mut records = Vec::with_capacity(stubs.len());
        for ((stub, stub_len), candidate) in stubs.into_iter().zip(stub_lens).zip(candidates) {
            let Candidate::Deliver {
                key,
                enriched,
                original,
            } = candidate
            else {
                records.push(stub);
                continue;
            };

            let mut delivered = None;
            let mut smallest = usize::MAX;
            for data in enriched.into_iter().chain(std::iter::once(original)) {
                let record =
                    FirehoseResponseRecord::delivered(&stub.record_id, data, key.clone());
                let cost = record_len(&record).saturating_sub(stub_len);
                smallest = smallest.min(cost);
                if budget.try_spend(cost) {
                    delivered = Some(record);
                    break;
                }
            }

            match delivered {
                Some(record) => records.push(record),
                None => {
                    let e = RecordError::SizeLimitExceeded {
                        size: smallest,
                        remaining: budget.remaining(),
                    };
                    warn!(
                        invocation_id = %event.invocation_id,
                        record_id = %stub.record_id,
                        error = %e,
                        "record failed to fit under the response ceiling"
                    );
                    records.push(stub);
                }
            }
        }

        FirehoseResponse { records }
    }
}

/// Transform one record. `Ok(None)` means the record carries nothing and is dropped.
async fn transform(
    record: &FirehoseRecord,
    enricher: &mut Enricher<'_>,
) -> Result<Option<Candidate>, RecordError> {
    let bytes = decode_data(&record.data)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let payload = parse_entry(&bytes)?;
    let key = PartitionKey::for_payload(&payload, record.approximate_arrival_timestamp)?;

    let additions = enricher.additions(&payload).await;
    let enriched = if additions.is_empty() {
        None
    } else {
        let mut entry = payload;
        entry.extend(additions);
        let bytes =
            serde_json::to_vec(&Value::Object(entry)).map_err(|e| RecordError::Parse(e.to_string()))?;
        Some(encode_data(&bytes))
    };

    Ok(Some(Candidate::Deliver {
        key,
        enriched,
        original: record.data.clone(),
    }))
}

fn parse_entry(bytes: &[u8]) -> Result<Map<String, Value>, RecordError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RecordError::NotAnObject),
        Err(e) => Err(RecordError::Parse(e.to_string())),
    }
}
