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
///
/// Logs go to stderr so that stdout stays reserved for command output.
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
            "fresca_cache_subscriptions_total",
            Unit::Count,
            "Total number of query subscriptions opened."
        );
        describe_counter!(
            "fresca_cache_hit_total",
            Unit::Count,
            "Total number of subscriptions served from a settled cache entry."
        );
        describe_counter!(
            "fresca_cache_miss_total",
            Unit::Count,
            "Total number of subscriptions that had to start a fetch."
        );
        describe_counter!(
            "fresca_cache_coalesced_total",
            Unit::Count,
            "Total number of subscriptions that joined an in-flight fetch."
        );
        describe_counter!(
            "fresca_cache_fetch_total",
            Unit::Count,
            "Total number of query fetches started."
        );
        describe_counter!(
            "fresca_query_fulfilled_total",
            Unit::Count,
            "Total number of query fetches that fulfilled."
        );
        describe_counter!(
            "fresca_query_rejected_total",
            Unit::Count,
            "Total number of query fetches that rejected."
        );
        describe_counter!(
            "fresca_cache_invalidated_total",
            Unit::Count,
            "Total number of cache entries touched by tag invalidation."
        );
        describe_counter!(
            "fresca_cache_refetch_total",
            Unit::Count,
            "Total number of refetches triggered by invalidation or by hand."
        );
        describe_counter!(
            "fresca_cache_evicted_total",
            Unit::Count,
            "Total number of cache entries dropped from the detached list."
        );
        describe_counter!(
            "fresca_mutation_total",
            Unit::Count,
            "Total number of mutations executed."
        );
        describe_counter!(
            "fresca_store_refresh_total",
            Unit::Count,
            "Total number of posts store refreshes."
        );
        describe_histogram!(
            "fresca_query_fetch_duration_ms",
            Unit::Milliseconds,
            "Query fetch plus transform latency in milliseconds."
        );
    });
}
