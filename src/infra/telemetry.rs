use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
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
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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
            "recipebox_cache_hit_total",
            Unit::Count,
            "Total number of aggregate cache hits."
        );
        describe_counter!(
            "recipebox_cache_miss_total",
            Unit::Count,
            "Total number of aggregate cache misses."
        );
        describe_counter!(
            "recipebox_cache_invalidate_total",
            Unit::Count,
            "Total number of aggregate cache invalidations."
        );
        describe_histogram!(
            "recipebox_recipe_expansion_ms",
            Unit::Milliseconds,
            "Latency of a full recipe expansion pass in milliseconds."
        );
        describe_counter!(
            "recipebox_recipe_expansion_failed_total",
            Unit::Count,
            "Total number of recipe expansion passes that failed."
        );
        describe_gauge!(
            "recipebox_realtime_clients",
            Unit::Count,
            "Current number of registered websocket clients."
        );
        describe_counter!(
            "recipebox_realtime_messages_total",
            Unit::Count,
            "Total number of chat messages accepted for relay."
        );
        describe_counter!(
            "recipebox_realtime_evicted_total",
            Unit::Count,
            "Total number of clients evicted because their queue was full or closed."
        );
    });
}
