use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::messaging::{BusPublisher, BusTransport, PublishResult};
use crate::metrics::HarnessMetrics;
use crate::synthesizer::{RecordSynthesizer, SynthesisMode};

// ============================================================================
// Order Feed - steady stream of generated orders
// ============================================================================
//
// Publishes `count` orders (0 = no limit) with `interval` between them. The
// shutdown signal is only observed between publishes, so an order that is
// already in flight always gets its acknowledgment or failure reported.
// `shutdown_on` starts listening right away, so a signal that arrives during
// a publish is remembered until the feed next looks.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    pub count: u64,
    pub interval: Duration,
    pub synthesis: SynthesisMode,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSummary {
    pub sent: u64,
    pub failed: u64,
    pub interrupted: bool,
}

impl FeedSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Await `signal` on its own task from now on; the returned future resolves
/// once it has fired, however late it is first polled.
pub fn shutdown_on<F>(signal: F) -> impl Future<Output = ()> + Send + 'static
where
    F: Future<Output = ()> + Send + 'static,
{
    let (tx, mut rx) = watch::channel(false);

    tokio::spawn(async move {
        signal.await;
        let _ = tx.send(true);
    });

    async move {
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

pub struct OrderFeed<T> {
    publisher: BusPublisher<T>,
    synthesizer: RecordSynthesizer,
    metrics: Arc<HarnessMetrics>,
    topic: String,
    settings: FeedSettings,
}

impl<T: BusTransport> OrderFeed<T> {
    pub fn new(
        publisher: BusPublisher<T>,
        metrics: Arc<HarnessMetrics>,
        topic: impl Into<String>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            publisher,
            synthesizer: RecordSynthesizer::new(settings.synthesis),
            metrics,
            topic: topic.into(),
            settings,
        }
    }

    pub async fn run<S>(&self, shutdown: S) -> FeedSummary
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut summary = FeedSummary::default();

        tracing::info!(
            topic = %self.topic,
            count = self.settings.count,
            interval_ms = self.settings.interval.as_millis() as u64,
            "Starting order feed"
        );

        loop {
            if self.settings.count > 0 && summary.sent + summary.failed >= self.settings.count {
                break;
            }

            let record = self.synthesizer.synthesize();
            let result = self.publisher.publish(&self.topic, &record).await;
            self.metrics.record_publish(&result);

            match result {
                PublishResult::Acknowledged(_) => {
                    summary.sent += 1;
                    tracing::debug!(sent = summary.sent, order_id = %record.order_id, "Order sent");
                }
                PublishResult::Failed(_) => summary.failed += 1,
            }

            if self.settings.count > 0 && summary.sent + summary.failed >= self.settings.count {
                break;
            }

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping feed");
                    summary.interrupted = true;
                    break;
                }
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        if let Err(e) = self.publisher.close().await {
            tracing::error!(error = %e, "Failed to flush bus producer");
            summary.failed += 1;
        }

        tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            interrupted = summary.interrupted,
            "Order feed finished"
        );
        summary
    }
}
