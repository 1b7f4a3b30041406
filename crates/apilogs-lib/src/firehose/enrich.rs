//! Access-log enrichment with API key details.
//!
//! Enrichment only ever appends fields: anything already present in the log
//! entry is left untouched.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ServiceError;

/// Flattened API key id field written by the access-log format.
pub const API_KEY_ID_FIELD: &str = "identity.apiKeyId";
/// Added: API key name.
pub const API_KEY_NAME_FIELD: &str = "identity.apiKeyName";
/// Added: API key description.
pub const API_KEY_DESCRIPTION_FIELD: &str = "identity.apiKeyDescription";

/// API Gateway writes this for context variables with no value.
const EMPTY_CONTEXT_VALUE: &str = "-";

/// Details of an API Gateway key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyDetails {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Resolves API key ids to their details.
#[async_trait]
pub trait ApiKeyDirectory: Send + Sync {
    async fn lookup(&self, key_id: &str) -> Result<ApiKeyDetails, ServiceError>;
}

/// Extract the API key id from a log entry, flattened or nested.
pub fn api_key_id(payload: &Map<String, Value>) -> Option<&str> {
    let id = match payload.get(API_KEY_ID_FIELD) {
        Some(value) => value.as_str(),
        None => payload
            .get("identity")
            .and_then(|identity| identity.get("apiKeyId"))
            .and_then(Value::as_str),
    }?;

    let id = id.trim();
    if id.is_empty() || id == EMPTY_CONTEXT_VALUE {
        None
    } else {
        Some(id)
    }
}

/// Per-invocation enrichment state.
///
/// Lookups are memoised for the lifetime of one batch only; a fresh
/// `Enricher` is built for every invocation.
///
/// A failed lookup, transient or not, is memoised as "no details": every
/// record in the batch carrying that key id is delivered without the name and
/// description fields. Output is therefore deterministic within a batch, but
/// a redelivery of the same batch after the directory recovers carries the
/// fields and differs byte-wise from the first delivery.
pub struct Enricher<'a> {
    directory: Option<&'a dyn ApiKeyDirectory>,
    cache: HashMap<String, Option<ApiKeyDetails>>,
}

impl<'a> Enricher<'a> {
    pub fn new(directory: Option<&'a dyn ApiKeyDirectory>) -> Self {
        Self {
            directory,
            cache: HashMap::new(),
        }
    }

    /// Number of distinct key ids looked up so far.
    pub fn lookups(&self) -> usize {
        self.cache.len()
    }

    /// Compute the fields to append to `payload`, in insertion order.
    pub async fn additions(&mut self, payload: &Map<String, Value>) -> Map<String, Value> {
        let mut added = Map::new();

        let Some(key_id) = api_key_id(payload) else {
            return added;
        };

        if !payload.contains_key(API_KEY_ID_FIELD) {
            added.insert(
                API_KEY_ID_FIELD.to_string(),
                Value::String(key_id.to_string()),
            );
        }

        if let Some(details) = self.details(key_id).await {
            if let Some(name) = details.name {
                if !payload.contains_key(API_KEY_NAME_FIELD) {
                    added.insert(API_KEY_NAME_FIELD.to_string(), Value::String(name));
                }
            }
            if let Some(description) = details.description {
                if !payload.contains_key(API_KEY_DESCRIPTION_FIELD) {
                    added.insert(
                        API_KEY_DESCRIPTION_FIELD.to_string(),
                        Value::String(description),
                    );
                }
            }
        }

        added
    }

    async fn details(&mut self, key_id: &str) -> Option<ApiKeyDetails> {
        let directory = self.directory?;

        if let Some(cached) = self.cache.get(key_id) {
            return cached.clone();
        }

        let resolved = match directory.lookup(key_id).await {
            Ok(details) => {
                debug!(key_id = %key_id, "resolved API key details");
                Some(details)
            }
            Err(e) => {
                warn!(key_id = %key_id, error = %e, "API key lookup failed; skipping key enrichment");
                None
            }
        };

        self.cache.insert(key_id.to_string(), resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDirectory {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ApiKeyDirectory for CountingDirectory {
        async fn lookup(&self, key_id: &str) -> Result<ApiKeyDetails, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if key_id == "broken" {
                return Err(ServiceError::transient("throttled"));
            }
            Ok(ApiKeyDetails {
                name: Some(format!("name-{key_id}")),
                description: None,
            })
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn extracts_flattened_and_nested_key_ids() {
        let flat = object(json!({ "identity.apiKeyId": "k1" }));
        let nested = object(json!({ "identity": { "apiKeyId": "k2" } }));
        let placeholder = object(json!({ "identity.apiKeyId": "-" }));

        assert_eq!(api_key_id(&flat), Some("k1"));
        assert_eq!(api_key_id(&nested), Some("k2"));
        assert_eq!(api_key_id(&placeholder), None);
    }

    #[tokio::test]
    async fn flattens_nested_key_id_without_directory() {
        let mut enricher = Enricher::new(None);
        let payload = object(json!({ "identity": { "apiKeyId": "k2" } }));

        let added = enricher.additions(&payload).await;
        assert_eq!(added.get(API_KEY_ID_FIELD), Some(&json!("k2")));
        assert_eq!(added.len(), 1);
    }

    #[tokio::test]
    async fn adds_key_name_and_memoises_lookups() {
        let directory = CountingDirectory {
            calls: AtomicUsize::new(0),
        };
        let mut enricher = Enricher::new(Some(&directory));
        let payload = object(json!({ "identity.apiKeyId": "k1" }));

        let first = enricher.additions(&payload).await;
        let second = enricher.additions(&payload).await;

        assert_eq!(first, second);
        assert_eq!(first.get(API_KEY_NAME_FIELD), Some(&json!("name-k1")));
        assert!(first.get(API_KEY_DESCRIPTION_FIELD).is_none());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(enricher.lookups(), 1);
    }

    #[tokio::test]
    async fn failed_lookup_is_memoised_as_unenriched_for_the_batch() {
        let directory = CountingDirectory {
            calls: AtomicUsize::new(0),
        };
        let mut enricher = Enricher::new(Some(&directory));
        let payload = object(json!({ "identity.apiKeyId": "broken" }));

        assert!(enricher.additions(&payload).await.is_empty());
        assert!(enricher.additions(&payload).await.is_empty());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn never_overwrites_existing_fields() {
        let directory = CountingDirectory {
            calls: AtomicUsize::new(0),
        };
        let mut enricher = Enricher::new(Some(&directory));
        let payload = object(json!({
            "identity.apiKeyId": "k1",
            "identity.apiKeyName": "already-set",
        }));

        assert!(enricher.additions(&payload).await.is_empty());
    }
}
