use thiserror::Error;

/// Convenient result alias for the API logs library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a custom-resource event carries no crawler name.
    #[error("CrawlerName is required in ResourceProperties")]
    MissingCrawlerName,

    /// Raised when the crawler reports a terminal failure.
    #[error("crawler {name} failed: {reason}")]
    PermanentJobFailure { name: String, reason: String },

    /// Raised by the orchestrator model when the poll budget is exhausted.
    #[error("crawler {name} did not complete after {attempts} status checks")]
    JobTimedOut { name: String, attempts: u32 },

    /// Wrapper for external service errors that could not be absorbed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors reported by the external services the handlers talk to.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The call failed in a way that may succeed on retry (throttling,
    /// network, 5xx).
    #[error("transient service error: {message}")]
    Transient { message: String },

    /// The referenced entity does not exist.
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    /// The crawler rejected a start command because a crawl is in progress.
    #[error("crawler {name} is already running")]
    AlreadyRunning { name: String },
}

impl ServiceError {
    /// Shorthand for a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Returns true when retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Per-record failures. None of these abort the surrounding batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// Transport encoding was not valid base64.
    #[error("record data is not valid base64: {0}")]
    Decode(String),

    /// Payload was not valid JSON.
    #[error("record payload is not valid JSON: {0}")]
    Parse(String),

    /// Payload was valid JSON but not an object.
    #[error("record payload must be a JSON object")]
    NotAnObject,

    /// Neither the payload nor the record envelope carried a timestamp.
    #[error("record has no usable timestamp")]
    MissingTimestamp,

    /// Timestamp could not be parsed or represented as a UTC calendar date.
    #[error("record timestamp {0} is invalid or out of range")]
    TimestampOutOfRange(String),

    /// Emitting the record would push the response over the delivery ceiling.
    #[error("record of {size} bytes does not fit in the remaining {remaining} byte budget")]
    SizeLimitExceeded { size: usize, remaining: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_failure_message_names_crawler() {
        let err = Error::PermanentJobFailure {
            name: "apilogs".to_string(),
            reason: "Access denied".to_string(),
        };
        assert_eq!(err.to_string(), "crawler apilogs failed: Access denied");
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(ServiceError::transient("throttled").is_transient());
        assert!(!ServiceError::NotFound {
            kind: "crawler",
            name: "x".to_string()
        }
        .is_transient());
        assert!(!ServiceError::AlreadyRunning {
            name: "x".to_string()
        }
        .is_transient());
    }
}
