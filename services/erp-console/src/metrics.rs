//! Prometheus recorder for the console
//!
//! The gate emits its counters through the `metrics` facade; this module
//! installs the recorder that collects them so `--metrics` can print them.

use erp_gate::metrics::{REFRESH_DURATION, REFRESH_DURATION_BUCKETS};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// The refresh duration is configured with histogram buckets so it renders
/// as a Prometheus histogram rather than the default summary.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REFRESH_DURATION.to_string()),
            REFRESH_DURATION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
}
