use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::HarnessError;
use crate::messaging::PublishResult;
use crate::verification::{ReadMiss, VerificationFailure, VerificationResult};

// ============================================================================
// Metrics Module - Prometheus metrics for a harness run
// ============================================================================
//
// Tracks:
// - publish attempts and publish outcomes
// - cold/warm read latencies and read outcomes of the cache check
// - verification verdicts
//
// The registry is rendered in text exposition format at the end of a run.
// ============================================================================

pub struct HarnessMetrics {
    registry: Registry,

    pub publish_attempts: IntCounter,
    pub publish_outcomes: IntCounterVec,

    pub read_latency: HistogramVec,
    pub query_outcomes: IntCounterVec,
    pub verifications: IntCounterVec,
}

impl HarnessMetrics {
    pub fn new() -> Result<Self, HarnessError> {
        let registry = Registry::new_custom(Some("order_probe".to_string()), None)?;

        let publish_attempts = IntCounter::new(
            "publish_attempts_total",
            "Delivery attempts made to the bus, retries included",
        )?;
        registry.register(Box::new(publish_attempts.clone()))?;

        let publish_outcomes = IntCounterVec::new(
            Opts::new("publish_outcomes_total", "Publish calls by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(publish_outcomes.clone()))?;

        let read_latency = HistogramVec::new(
            HistogramOpts::new("read_latency_seconds", "Order read latency during the cache check")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["phase"],
        )?;
        registry.register(Box::new(read_latency.clone()))?;

        let query_outcomes = IntCounterVec::new(
            Opts::new("query_outcomes_total", "Cache-check reads by phase and outcome"),
            &["phase", "outcome"],
        )?;
        registry.register(Box::new(query_outcomes.clone()))?;

        let verifications = IntCounterVec::new(
            Opts::new("verifications_total", "Cache verifications by result"),
            &["result"],
        )?;
        registry.register(Box::new(verifications.clone()))?;

        Ok(Self {
            registry,
            publish_attempts,
            publish_outcomes,
            read_latency,
            query_outcomes,
            verifications,
        })
    }

    pub fn record_publish(&self, result: &PublishResult) {
        self.publish_attempts.inc_by(u64::from(result.attempts()));
        self.publish_outcomes.with_label_values(&[result.kind()]).inc();
    }

    pub fn record_verification(&self, result: &VerificationResult) {
        let label = match result {
            VerificationResult::Pass(observation) => {
                self.record_found("cold", observation.cold.as_secs_f64());
                self.record_found("warm", observation.warm.as_secs_f64());
                "pass"
            }
            VerificationResult::Fail(VerificationFailure::NotFaster { cold, warm }) => {
                self.record_found("cold", cold.as_secs_f64());
                self.record_found("warm", warm.as_secs_f64());
                "not_faster"
            }
            VerificationResult::Fail(VerificationFailure::ColdReadMissing(miss)) => {
                self.record_miss("cold", miss);
                "cold_read_missing"
            }
            VerificationResult::Fail(VerificationFailure::WarmReadMissing(miss)) => {
                // the warm read only happens after a successful cold read
                self.query_outcomes.with_label_values(&["cold", "found"]).inc();
                self.record_miss("warm", miss);
                "warm_read_missing"
            }
        };
        self.verifications.with_label_values(&[label]).inc();
    }

    fn record_found(&self, phase: &str, latency_secs: f64) {
        self.query_outcomes.with_label_values(&[phase, "found"]).inc();
        self.read_latency.with_label_values(&[phase]).observe(latency_secs);
    }

    fn record_miss(&self, phase: &str, miss: &ReadMiss) {
        self.query_outcomes.with_label_values(&[phase, miss.kind()]).inc();
    }

    /// Text exposition of everything recorded so far
    pub fn render(&self) -> Result<String, HarnessError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
