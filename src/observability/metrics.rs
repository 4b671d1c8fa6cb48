//! Metrics for gateway calls and usecases, recorded through the `metrics`
//! facade. Nothing is exported unless a recorder is installed with [`init`].

use std::fmt;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// All metric names used by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    GatewayCallsSuccess,
    GatewayCallsError,
    GatewayCallDuration,
    UsecaseRuns,
    UnenrolOutcomes,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::GatewayCallsSuccess => "moodle_gateway_calls_success_total",
            MetricName::GatewayCallsError => "moodle_gateway_calls_error_total",
            MetricName::GatewayCallDuration => "moodle_gateway_call_duration_seconds",
            MetricName::UsecaseRuns => "moodle_gateway_usecase_runs_total",
            MetricName::UnenrolOutcomes => "moodle_gateway_unenrol_outcomes_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs the Prometheus recorder and returns a handle for rendering snapshots.
pub fn init() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    Ok(handle)
}

pub mod gateway {
    use super::MetricName;

    pub fn call_success(operation: &'static str) {
        ::metrics::counter!(MetricName::GatewayCallsSuccess.as_str(), "operation" => operation).increment(1);
    }

    pub fn call_error(operation: &'static str, kind: &'static str) {
        ::metrics::counter!(
            MetricName::GatewayCallsError.as_str(),
            "operation" => operation,
            "kind" => kind
        )
        .increment(1);
    }

    pub fn call_duration(operation: &'static str, secs: f64) {
        ::metrics::histogram!(MetricName::GatewayCallDuration.as_str(), "operation" => operation).record(secs);
    }
}

pub mod usecase {
    use super::MetricName;

    pub fn run(usecase: &'static str, outcome: &'static str) {
        ::metrics::counter!(
            MetricName::UsecaseRuns.as_str(),
            "usecase" => usecase,
            "outcome" => outcome
        )
        .increment(1);
    }

    pub fn unenrol_outcome(succeeded: bool) {
        let outcome = if succeeded { "unenrolled" } else { "failed" };
        ::metrics::counter!(MetricName::UnenrolOutcomes.as_str(), "outcome" => outcome).increment(1);
    }
}
