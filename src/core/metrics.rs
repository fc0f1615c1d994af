use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROMETHEUS: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder once, when enabled.
pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROMETHEUS.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS.set(handle);
    tracing::info!("Prometheus recorder installed");
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROMETHEUS.get().map(PrometheusHandle::render)
}

pub(crate) fn record_http_request(status: u16, latency: Duration) {
    let status = status.to_string();
    metrics::counter!("http_requests_total", "status" => status.clone()).increment(1);
    metrics::histogram!("http_request_duration_seconds", "status" => status)
        .record(latency.as_secs_f64());
}

/// Attempt lifecycle transitions: `started`, `resumed`, `completed`, `rejected`.
pub(crate) fn record_attempt_event(event: &'static str) {
    metrics::counter!("quiz_attempt_events_total", "event" => event).increment(1);
}

pub(crate) fn record_attempt_score(score: f64) {
    metrics::histogram!("quiz_attempt_score_percent").record(score);
}

pub(crate) fn record_rate_limited(scope: &'static str) {
    metrics::counter!("rate_limited_requests_total", "scope" => scope).increment(1);
}
