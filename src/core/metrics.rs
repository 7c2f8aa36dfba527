use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;
use crate::db::types::AttemptOutcome;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_session_generated(template_key: &str, problem_count: usize) {
    metrics::counter!("sessions_generated_total", "template" => template_key.to_string())
        .increment(1);
    metrics::histogram!("session_generated_problems", "template" => template_key.to_string())
        .record(problem_count as f64);
}

pub(crate) fn record_generation_rejected(template_key: &str, reason: &'static str) {
    metrics::counter!(
        "session_generation_rejected_total",
        "template" => template_key.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub(crate) fn record_attempt_completed(outcome: AttemptOutcome) {
    metrics::counter!("attempts_completed_total", "outcome" => outcome.as_str()).increment(1);
}
