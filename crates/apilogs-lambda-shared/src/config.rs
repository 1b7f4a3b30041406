//! Environment configuration read once per cold start.
//!
//! # Environment Variables
//!
//! - `APILOGS_RESPONSE_CEILING_BYTES`: maximum Firehose response size
//!   (default: 6 MiB)
//! - `APILOGS_ENRICH_API_KEYS`: resolve API key names through API Gateway
//!   (default: `true`)

use apilogs_lib::firehose::{ProcessorConfig, DEFAULT_RESPONSE_CEILING};
use tracing::warn;

pub const RESPONSE_CEILING_ENV: &str = "APILOGS_RESPONSE_CEILING_BYTES";
pub const ENRICH_API_KEYS_ENV: &str = "APILOGS_ENRICH_API_KEYS";

/// Configuration for the enrichment Lambda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnricherConfig {
    pub response_ceiling: usize,
    pub enrich_api_keys: bool,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            response_ceiling: DEFAULT_RESPONSE_CEILING,
            enrich_api_keys: true,
        }
    }
}

impl EnricherConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to the defaults with a warning rather than
    /// failing the cold start.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let response_ceiling = match lookup(RESPONSE_CEILING_ENV) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => {
                    warn!(variable = RESPONSE_CEILING_ENV, value = %raw, "ignoring invalid value");
                    defaults.response_ceiling
                }
            },
            None => defaults.response_ceiling,
        };

        let enrich_api_keys = match lookup(ENRICH_API_KEYS_ENV) {
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    warn!(variable = ENRICH_API_KEYS_ENV, value = %raw, "ignoring invalid value");
                    defaults.enrich_api_keys
                }
            },
            None => defaults.enrich_api_keys,
        };

        Self {
            response_ceiling,
            enrich_api_keys,
        }
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            response_ceiling: self.response_ceiling,
        }
    }
}
