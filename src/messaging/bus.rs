use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::utils::IsTransient;

// ============================================================================
// Bus Transport Abstraction
// ============================================================================
//
// The publisher talks to the bus only through `BusTransport`, so the Kafka
// client can be swapped for a scripted broker in tests.
//
// ============================================================================

/// Durability level a broker confirmed for a write. Ordered weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AckLevel {
    #[allow(dead_code)]
    None,
    #[allow(dead_code)]
    Leader,
    AllReplicas,
}

impl AckLevel {
    /// Value for the Kafka `acks` producer setting
    pub fn as_kafka_acks(&self) -> &'static str {
        match self {
            AckLevel::None => "0",
            AckLevel::Leader => "1",
            AckLevel::AllReplicas => "all",
        }
    }
}

impl fmt::Display for AckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckLevel::None => write!(f, "none"),
            AckLevel::Leader => write!(f, "leader"),
            AckLevel::AllReplicas => write!(f, "all-replicas"),
        }
    }
}

/// Broker confirmation for one write
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryAck {
    pub partition: i32,
    pub offset: i64,
    pub level: AckLevel,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BusError {
    /// Broker unreachable, leader election, under-replicated partition
    #[error("bus temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("broker acknowledged at {got} but {required} is required")]
    InsufficientAck { required: AckLevel, got: AckLevel },

    #[error("bus rejected the write: {0}")]
    Rejected(String),

    #[error("flush did not complete: {0}")]
    Flush(String),
}

impl IsTransient for BusError {
    fn is_transient(&self) -> bool {
        matches!(self, BusError::Unavailable(_) | BusError::InsufficientAck { .. })
    }
}

#[async_trait]
pub trait BusTransport: Send + Sync {
    /// Hand one keyed message to the bus and wait for the broker's answer.
    async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<DeliveryAck, BusError>;

    /// Wait for in-flight messages to be delivered before teardown.
    async fn flush(&self, timeout: Duration) -> Result<(), BusError>;
}

#[async_trait]
impl<T: BusTransport + ?Sized> BusTransport for Arc<T> {
    async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<DeliveryAck, BusError> {
        (**self).send(topic, key, payload).await
    }

    async fn flush(&self, timeout: Duration) -> Result<(), BusError> {
        (**self).flush(timeout).await
    }
}
