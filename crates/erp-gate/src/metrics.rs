//! Gate metrics
//!
//! - `erp_gate_requests_total` (counter): label `status`
//! - `erp_gate_refresh_total` (counter): label `outcome`
//!   (`success`, `failure`, `timeout`, `no_token`)
//! - `erp_gate_refresh_duration_seconds` (histogram)
//! - `erp_gate_replay_total` (counter): label `outcome`
//!   (`ok`, `error`, `unauthorized`)
//!
//! Calls are no-ops until a recorder is installed.

pub const REFRESH_DURATION: &str = "erp_gate_refresh_duration_seconds";

/// Buckets for the refresh duration histogram, 5ms to 30s.
pub const REFRESH_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

pub fn record_request(status: u16) {
    metrics::counter!("erp_gate_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_refresh(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("erp_gate_refresh_total", "outcome" => outcome).increment(1);
    metrics::histogram!(REFRESH_DURATION).record(duration_secs);
}

pub fn record_replay(outcome: &'static str) {
    metrics::counter!("erp_gate_replay_total", "outcome" => outcome).increment(1);
}
