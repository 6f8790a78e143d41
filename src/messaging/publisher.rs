use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::bus::{AckLevel, BusError, BusTransport, DeliveryAck};
use crate::models::{OrderRecord, ShapeError};
use crate::utils::{retry_on_transient, RetryConfig, RetryResult};

// ============================================================================
// Bus Publisher
// ============================================================================
//
// Contract for one `publish` call:
// - the record is JSON-encoded once and keyed by its order id
// - an ack below `required_ack` counts as a transient failure
// - transient failures are retried up to `retry.max_attempts` total attempts
// - the whole call, retries and backoff included, is bounded by `ack_timeout`
//
// Retries resend the same bytes under the same key; they are re-attempts of
// one logical order, never new orders.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub required_ack: AckLevel,
    pub ack_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            required_ack: AckLevel::AllReplicas,
            ack_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishReceipt {
    pub order_id: String,
    pub partition: i32,
    pub offset: i64,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PublishFailure {
    #[error("timed out after {after:?} waiting for acknowledgment ({attempts} attempts started)")]
    Timeout { after: Duration, attempts: u32 },

    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: BusError },

    #[error("permanent bus failure after {attempts} attempts: {error}")]
    Rejected { attempts: u32, error: BusError },

    #[error("record is structurally invalid: {0}")]
    InvalidRecord(ShapeError),

    #[error("failed to encode record: {0}")]
    Encoding(String),
}

impl PublishFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            PublishFailure::Timeout { .. } => "timeout",
            PublishFailure::RetriesExhausted { .. } => "retries_exhausted",
            PublishFailure::Rejected { .. } => "rejected",
            PublishFailure::InvalidRecord(_) => "invalid_record",
            PublishFailure::Encoding(_) => "encoding",
        }
    }

    /// Delivery attempts made before the failure was decided
    pub fn attempts(&self) -> u32 {
        match self {
            PublishFailure::Timeout { attempts, .. } => *attempts,
            PublishFailure::RetriesExhausted { attempts, .. } => *attempts,
            PublishFailure::Rejected { attempts, .. } => *attempts,
            PublishFailure::InvalidRecord(_) | PublishFailure::Encoding(_) => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishResult {
    Acknowledged(PublishReceipt),
    Failed(PublishFailure),
}

impl PublishResult {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, PublishResult::Acknowledged(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PublishResult::Acknowledged(_) => "acknowledged",
            PublishResult::Failed(failure) => failure.kind(),
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PublishResult::Acknowledged(receipt) => receipt.attempts,
            PublishResult::Failed(failure) => failure.attempts(),
        }
    }
}

pub struct BusPublisher<T> {
    transport: T,
    settings: PublishSettings,
}

impl<T: BusTransport> BusPublisher<T> {
    pub fn new(transport: T, settings: PublishSettings) -> Self {
        Self { transport, settings }
    }

    pub async fn publish(&self, topic: &str, record: &OrderRecord) -> PublishResult {
        if let Err(e) = record.check_shape() {
            tracing::error!(order_id = %record.order_id, error = %e, "Refusing to publish malformed record");
            return PublishResult::Failed(PublishFailure::InvalidRecord(e));
        }

        let payload = match serde_json::to_vec(record) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(order_id = %record.order_id, error = %e, "Failed to encode record");
                return PublishResult::Failed(PublishFailure::Encoding(e.to_string()));
            }
        };

        let key = record.order_id.as_str();
        let attempts = AtomicU32::new(0);

        let outcome = tokio::time::timeout(
            self.settings.ack_timeout,
            retry_on_transient(self.settings.retry.clone(), |attempt| {
                attempts.store(attempt, Ordering::SeqCst);
                self.send_once(topic, key, &payload)
            }),
        )
        .await;

        let attempts = attempts.load(Ordering::SeqCst);

        let result = match outcome {
            Err(_elapsed) => PublishResult::Failed(PublishFailure::Timeout {
                after: self.settings.ack_timeout,
                attempts,
            }),
            Ok(RetryResult::Success(ack)) => PublishResult::Acknowledged(PublishReceipt {
                order_id: record.order_id.clone(),
                partition: ack.partition,
                offset: ack.offset,
                attempts,
            }),
            Ok(RetryResult::Failed(last_error)) => {
                PublishResult::Failed(PublishFailure::RetriesExhausted { attempts, last_error })
            }
            Ok(RetryResult::PermanentFailure(error)) => {
                PublishResult::Failed(PublishFailure::Rejected { attempts, error })
            }
        };

        match &result {
            PublishResult::Acknowledged(receipt) => tracing::info!(
                topic = %topic,
                order_id = %receipt.order_id,
                partition = receipt.partition,
                offset = receipt.offset,
                attempts = receipt.attempts,
                payload_bytes = payload.len(),
                "✅ Record acknowledged by all replicas"
            ),
            PublishResult::Failed(failure) => tracing::error!(
                topic = %topic,
                order_id = %record.order_id,
                error = %failure,
                "❌ Failed to publish record"
            ),
        }

        result
    }

    async fn send_once(&self, topic: &str, key: &str, payload: &[u8]) -> Result<DeliveryAck, BusError> {
        let ack = self.transport.send(topic, key, payload).await?;

        if ack.level < self.settings.required_ack {
            return Err(BusError::InsufficientAck {
                required: self.settings.required_ack,
                got: ack.level,
            });
        }

        Ok(ack)
    }

    /// Flush in-flight deliveries; bounded by the ack timeout.
    pub async fn close(&self) -> Result<(), BusError> {
        tracing::info!("Flushing bus producer");
        self.transport.flush(self.settings.ack_timeout).await
    }
}
