// ============================================================================
// Test doubles shared by unit tests
// ============================================================================

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::messaging::bus::DeliveryAck;
use crate::messaging::{AckLevel, BusError, BusTransport};
use crate::models::OrderRecord;
use crate::query::{OrderQuery, QueryOutcome};

#[derive(Debug, Clone)]
pub enum SendBehaviour {
    Ack(AckLevel),
    Fail(BusError),
    /// Never answers
    Hang,
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

/// Broker that plays back a script, then repeats `fallback` forever.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<SendBehaviour>>,
    fallback: SendBehaviour,
    sent: Mutex<Vec<SentMessage>>,
    flushes: AtomicU32,
}

impl ScriptedTransport {
    pub fn new(script: Vec<SendBehaviour>, fallback: SendBehaviour) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            sent: Mutex::new(Vec::new()),
            flushes: AtomicU32::new(0),
        }
    }

    pub fn always(behaviour: SendBehaviour) -> Self {
        Self::new(Vec::new(), behaviour)
    }

    pub fn attempts(&self) -> u32 {
        self.sent.lock().unwrap().len() as u32
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> u32 {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BusTransport for ScriptedTransport {
    async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<DeliveryAck, BusError> {
        let offset = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentMessage {
                topic: topic.to_string(),
                key: key.to_string(),
                payload: payload.to_vec(),
            });
            sent.len() as i64 - 1
        };

        let behaviour = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match behaviour {
            SendBehaviour::Ack(level) => Ok(DeliveryAck {
                partition: 0,
                offset,
                level,
            }),
            SendBehaviour::Fail(error) => Err(error),
            SendBehaviour::Hang => std::future::pending().await,
        }
    }

    async fn flush(&self, _timeout: Duration) -> Result<(), BusError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Query endpoint that answers from a queue; 404 once the queue is empty.
pub struct ScriptedQuery {
    outcomes: Mutex<VecDeque<QueryOutcome>>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedQuery {
    pub fn new(outcomes: Vec<QueryOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn found(record: &OrderRecord, latency: Duration) -> QueryOutcome {
        QueryOutcome::Found {
            record: record.clone(),
            latency,
        }
    }

    pub fn fetched_ids(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderQuery for ScriptedQuery {
    async fn fetch(&self, order_id: &str) -> QueryOutcome {
        self.fetched.lock().unwrap().push(order_id.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(QueryOutcome::NotFound {
                status: 404,
                latency: Duration::ZERO,
            })
    }
}
