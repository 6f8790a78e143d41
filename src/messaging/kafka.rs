use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    error::{KafkaError, RDKafkaErrorCode},
    producer::{future_producer::Delivery, FutureProducer, FutureRecord, Producer},
    util::Timeout,
};
use std::time::Duration;

use super::bus::{AckLevel, BusError, BusTransport, DeliveryAck};
use crate::config::BusConfig;
use crate::error::HarnessError;

// ============================================================================
// Kafka Transport (rdkafka FutureProducer)
// ============================================================================
//
// librdkafka's internal resend is disabled (`message.send.max.retries=0`):
// each `send` is exactly one delivery attempt and the publisher owns the
// retry budget. The configured `acks` level is what a successful delivery
// report guarantees, so it is reported back on every ack.
//
// `message.timeout.ms` is one attempt's share of the publish bound, so a
// `MessageTimedOut` report comes back in time to be retried.
//
// ============================================================================

pub struct KafkaTransport {
    producer: FutureProducer,
    acks: AckLevel,
    queue_timeout: Duration,
}

impl KafkaTransport {
    pub fn new(config: &BusConfig) -> Result<Self, HarnessError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("acks", config.acks.as_kafka_acks())
            .set("message.send.max.retries", "0")
            .set("message.timeout.ms", config.message_timeout.as_millis().to_string())
            .create()?;

        tracing::info!(
            brokers = %config.brokers,
            acks = %config.acks,
            "Kafka producer created"
        );

        Ok(Self {
            producer,
            acks: config.acks,
            queue_timeout: config.message_timeout,
        })
    }
}

#[async_trait]
impl BusTransport for KafkaTransport {
    async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<DeliveryAck, BusError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(self.queue_timeout)).await {
            Ok(delivery) => Ok(delivery_ack(&delivery, self.acks)),
            Err((error, _message)) => Err(classify(&error)),
        }
    }

    async fn flush(&self, timeout: Duration) -> Result<(), BusError> {
        let producer = self.producer.clone();

        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| BusError::Flush(e.to_string()))?
            .map_err(|e| BusError::Flush(e.to_string()))
    }
}

/// A delivery report only arrives once the configured `acks` level is met.
fn delivery_ack(delivery: &Delivery, level: AckLevel) -> DeliveryAck {
    DeliveryAck {
        partition: delivery.partition,
        offset: delivery.offset,
        level,
    }
}

fn classify(error: &KafkaError) -> BusError {
    match error.rdkafka_error_code() {
        Some(code) if is_transient_code(code) => BusError::Unavailable(error.to_string()),
        _ => BusError::Rejected(error.to_string()),
    }
}

fn is_transient_code(code: RDKafkaErrorCode) -> bool {
    matches!(
        code,
        RDKafkaErrorCode::BrokerTransportFailure
            | RDKafkaErrorCode::AllBrokersDown
            | RDKafkaErrorCode::LeaderNotAvailable
            | RDKafkaErrorCode::NotLeaderForPartition
            | RDKafkaErrorCode::NotEnoughReplicas
            | RDKafkaErrorCode::NotEnoughReplicasAfterAppend
            | RDKafkaErrorCode::RequestTimedOut
            | RDKafkaErrorCode::MessageTimedOut
            | RDKafkaErrorCode::NetworkException
            | RDKafkaErrorCode::QueueFull
    )
}
