use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "folio_retry_attempts_total",
            Unit::Count,
            "Rate-limited calls that were retried after a backoff delay."
        );
        describe_counter!(
            "folio_retry_exhausted_total",
            Unit::Count,
            "Rate-limited calls that gave up after the last allowed attempt."
        );
        describe_counter!(
            "folio_uploads_total",
            Unit::Count,
            "Media uploads by outcome (done, failed, rejected)."
        );
        describe_counter!(
            "folio_api_requests_total",
            Unit::Count,
            "Content API requests by method and response class."
        );
        describe_histogram!(
            "folio_api_request_ms",
            Unit::Milliseconds,
            "Content API request latency in milliseconds."
        );
    });
}
