use std::sync::Arc;
use std::time::Duration;

use crate::config::HarnessConfig;
use crate::messaging::{BusError, BusPublisher, BusTransport, PublishFailure, PublishResult};
use crate::metrics::HarnessMetrics;
use crate::models::OrderRecord;
use crate::query::OrderQuery;
use crate::synthesizer::RecordSynthesizer;
use crate::verification::{CacheVerifier, VerificationFailure, VerificationResult};

// ============================================================================
// Harness Runner - one validation pass
// ============================================================================
//
// synthesize -> publish -> settle -> verify cache -> round-trip check
//            -> publish bulk records -> flush
//
// Every step runs even if an earlier one failed; failures are collected
// into the report. The transport is flushed on every path.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub topic: String,
    pub settle_interval: Duration,
    pub bulk_count: usize,
}

impl From<&HarnessConfig> for RunSettings {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            topic: config.topic.clone(),
            settle_interval: config.settle_interval,
            bulk_count: config.bulk_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunFailure {
    #[error("publish of {order_id} failed: {failure}")]
    Publish { order_id: String, failure: PublishFailure },

    #[error("cache check for {order_id} failed: {failure} ({detail})")]
    Verification {
        order_id: String,
        failure: VerificationFailure,
        detail: String,
    },

    #[error("fetched {order_id} differs from what was published: {}", .differences.join("; "))]
    RoundTrip { order_id: String, differences: Vec<String> },

    #[error("bus teardown failed: {0}")]
    Teardown(BusError),
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub order_id: String,
    pub publish: PublishResult,
    pub verification: VerificationResult,
    pub bulk: Vec<(String, PublishResult)>,
    pub failures: Vec<RunFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn log_summary(&self) {
        let bulk_acked = self.bulk.iter().filter(|(_, r)| r.is_acknowledged()).count();
        let published = self.publish.is_acknowledged();
        let cache_verified = self.verification.is_pass();

        if self.is_success() {
            tracing::info!(
                order_id = %self.order_id,
                published,
                cache_verified,
                bulk_acknowledged = bulk_acked,
                "✅ All checks passed"
            );
            return;
        }

        for failure in &self.failures {
            tracing::error!(error = %failure, "Run failure");
        }
        tracing::error!(
            order_id = %self.order_id,
            failures = self.failures.len(),
            published,
            cache_verified,
            bulk_acknowledged = bulk_acked,
            bulk_total = self.bulk.len(),
            "❌ Harness run failed"
        );
    }
}

pub struct HarnessRunner<T, Q> {
    synthesizer: RecordSynthesizer,
    publisher: BusPublisher<T>,
    verifier: CacheVerifier<Q>,
    metrics: Arc<HarnessMetrics>,
    settings: RunSettings,
}

impl<T: BusTransport, Q: OrderQuery> HarnessRunner<T, Q> {
    pub fn new(
        publisher: BusPublisher<T>,
        verifier: CacheVerifier<Q>,
        metrics: Arc<HarnessMetrics>,
        settings: RunSettings,
    ) -> Self {
        Self {
            synthesizer: RecordSynthesizer::template(),
            publisher,
            verifier,
            metrics,
            settings,
        }
    }

    pub async fn run(&self) -> RunReport {
        let mut failures = Vec::new();

        let record = self.synthesizer.synthesize();
        tracing::info!(order_id = %record.order_id, topic = %self.settings.topic, "Publishing test order");
        let publish = self.publish(&record, &mut failures).await;

        if !self.settings.settle_interval.is_zero() {
            tracing::info!(
                settle_ms = self.settings.settle_interval.as_millis() as u64,
                "Waiting for the pipeline to pick up the order"
            );
            tokio::time::sleep(self.settings.settle_interval).await;
        }

        let verification = self.verifier.verify_caching(&record.order_id).await;
        self.metrics.record_verification(&verification);

        match &verification {
            VerificationResult::Pass(observation) => {
                let differences = record.identity_diff(&observation.record);
                if !differences.is_empty() {
                    failures.push(RunFailure::RoundTrip {
                        order_id: record.order_id.clone(),
                        differences,
                    });
                }
            }
            VerificationResult::Fail(failure) => failures.push(RunFailure::Verification {
                order_id: record.order_id.clone(),
                failure: failure.clone(),
                detail: failure.detail(),
            }),
        }

        if self.settings.bulk_count > 0 {
            tracing::info!(count = self.settings.bulk_count, "Publishing additional orders");
        }
        let mut bulk = Vec::with_capacity(self.settings.bulk_count);
        for _ in 0..self.settings.bulk_count {
            let extra = self.synthesizer.synthesize();
            let result = self.publish(&extra, &mut failures).await;
            bulk.push((extra.order_id, result));
        }

        if let Err(e) = self.publisher.close().await {
            tracing::error!(error = %e, "Failed to flush bus producer");
            failures.push(RunFailure::Teardown(e));
        }

        RunReport {
            order_id: record.order_id,
            publish,
            verification,
            bulk,
            failures,
        }
    }

    async fn publish(&self, record: &OrderRecord, failures: &mut Vec<RunFailure>) -> PublishResult {
        let result = self.publisher.publish(&self.settings.topic, record).await;
        self.metrics.record_publish(&result);

        if let PublishResult::Failed(failure) = &result {
            failures.push(RunFailure::Publish {
                order_id: record.order_id.clone(),
                failure: failure.clone(),
            });
        }

        result
    }
}
