//! Metrics collection and registry.

use crate::assessment::{
    AssessmentError, AssessmentObserver, AssessmentResult, RequestError, TestSelection,
};
use prometheus::{
    exponential_buckets, linear_buckets, Encoder, HistogramOpts, HistogramVec, IntCounterVec,
    Opts, Registry, TextEncoder,
};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for assessment workloads.
///
/// Owns its own [`Registry`]; nothing is registered globally.
pub struct MetricsRegistry {
    registry: Registry,

    requests_total: IntCounterVec,
    duration_seconds: HistogramVec,
    errors_total: IntCounterVec,
    data_size_bytes: HistogramVec,
    min_entropy_value: HistogramVec,
    rejected_total: IntCounterVec,
}

impl MetricsRegistry {
    /// Creates a new registry with all assessment metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "entropy_requests_total",
                "Total number of entropy assessment requests",
            ),
            &["test_type"],
        )?;
        // 10ms to ~5s
        let duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "entropy_duration_seconds",
                "Duration of entropy assessment in seconds",
            )
            .buckets(exponential_buckets(0.01, 2.0, 10)?),
            &["test_type"],
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new(
                "entropy_errors_total",
                "Total number of entropy assessment errors",
            ),
            &["test_type", "error_type"],
        )?;
        // 1KiB to ~100MB
        let data_size_bytes = HistogramVec::new(
            HistogramOpts::new(
                "entropy_data_size_bytes",
                "Size of data being assessed in bytes",
            )
            .buckets(exponential_buckets(1024.0, 10.0, 6)?),
            &["test_type"],
        )?;
        // 0 to 8 in 0.5 steps
        let min_entropy_value = HistogramVec::new(
            HistogramOpts::new(
                "entropy_min_entropy_value",
                "Minimum entropy values calculated",
            )
            .buckets(linear_buckets(0.0, 0.5, 17)?),
            &["test_type"],
        )?;
        let rejected_total = IntCounterVec::new(
            Opts::new(
                "entropy_rejected_total",
                "Total number of requests rejected before assessment",
            ),
            &["reason"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(duration_seconds.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(data_size_bytes.clone()))?;
        registry.register(Box::new(min_entropy_value.clone()))?;
        registry.register(Box::new(rejected_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            duration_seconds,
            errors_total,
            data_size_bytes,
            min_entropy_value,
            rejected_total,
        })
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl AssessmentObserver for MetricsRegistry {
    fn rejected(&self, error: &RequestError) {
        self.rejected_total.with_label_values(&[error.reason()]).inc();
    }

    fn started(&self, selection: TestSelection, sample_bytes: usize) {
        let label = [selection.as_str()];
        self.requests_total.with_label_values(&label).inc();
        self.data_size_bytes
            .with_label_values(&label)
            .observe(sample_bytes as f64);
    }

    fn completed(&self, selection: TestSelection, result: &AssessmentResult, elapsed: Duration) {
        let label = [selection.as_str()];
        self.duration_seconds
            .with_label_values(&label)
            .observe(elapsed.as_secs_f64());
        if result.min_entropy.is_finite() {
            self.min_entropy_value
                .with_label_values(&label)
                .observe(result.min_entropy);
        }
    }

    fn failed(&self, selection: TestSelection, error: &AssessmentError, elapsed: Duration) {
        self.duration_seconds
            .with_label_values(&[selection.as_str()])
            .observe(elapsed.as_secs_f64());
        self.errors_total
            .with_label_values(&[selection.as_str(), error.kind().as_str()])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{AssessmentCoordinator, AssessmentRequest};
    use crate::estimators::MockSuite;
    use std::sync::Arc;

    fn run(registry: Arc<MetricsRegistry>, suite: MockSuite, data: &[u8], run_iid: bool, run_non_iid: bool) {
        let coordinator =
            AssessmentCoordinator::new(Arc::new(suite)).with_observer(registry);
        let _ = coordinator.assess(&AssessmentRequest {
            data,
            word_size: 8,
            run_iid,
            run_non_iid,
        });
    }

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_completed_request_recorded() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        run(registry.clone(), MockSuite::new(), &[1, 2, 3, 4], true, true);

        let output = registry.encode().unwrap();
        assert!(output.contains("entropy_requests_total{test_type=\"mixed\"} 1"));
        assert!(output.contains("entropy_data_size_bytes_count{test_type=\"mixed\"} 1"));
        assert!(output.contains("entropy_min_entropy_value_count{test_type=\"mixed\"} 1"));
        assert!(output.contains("entropy_duration_seconds_count{test_type=\"mixed\"} 1"));
    }

    #[test]
    fn test_failure_recorded_with_kind() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        run(registry.clone(), MockSuite::failing(-2, "boom"), &[1, 2, 3], false, true);

        let output = registry.encode().unwrap();
        assert!(output.contains(
            "entropy_errors_total{error_type=\"foreign\",test_type=\"Non-IID\"} 1"
        ));
    }

    #[test]
    fn test_rejection_recorded() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        run(registry.clone(), MockSuite::new(), &[], true, false);

        let output = registry.encode().unwrap();
        assert!(output.contains("entropy_rejected_total{reason=\"empty_data\"} 1"));
        assert!(!output.contains("entropy_requests_total{"));
    }
}
