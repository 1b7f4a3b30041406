//! Tracing initialization for Lambda functions.
//!
//! Configures JSON-formatted tracing output suitable for CloudWatch Logs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging (default, CloudWatch).
    #[default]
    Json,
    /// Human-readable text logging (local runs with `cargo lambda watch`).
    Text,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value. Anything other than `text`/`pretty` is JSON.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "text" | "pretty" => LogFormat::Text,
            _ => LogFormat::Json,
        }
    }

    fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// Initialize tracing with JSON formatting for CloudWatch Logs.
///
/// This should be called once at the start of the Lambda `main` function,
/// before calling `lambda_runtime::run()`.
///
/// The log level can be controlled via the `RUST_LOG` environment variable.
/// Defaults to `info` if not set. Set `LOG_FORMAT=text` for readable local
/// output.
///
/// # Example
///
/// ```no_run
/// use apilogs_lambda_shared::init_tracing;
///
/// #[tokio::main]
/// async fn main() -> Result<(), lambda_runtime::Error> {
///     init_tracing();
///     // ... rest of Lambda setup
///     Ok(())
/// }
/// ```
pub fn init_tracing() {
    // Use RUST_LOG env var, defaulting to info level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match LogFormat::from_env() {
        LogFormat::Text => registry.with(fmt::layer().without_time()).init(),
        LogFormat::Json => {
            // The Lambda log stream already timestamps every line.
            let fmt_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_current_span(false)
                .without_time()
                .flatten_event(true);
            registry.with(fmt_layer).init();
        }
    }
}
