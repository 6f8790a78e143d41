use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::QueryConfig;
use crate::error::HarnessError;
use crate::models::OrderRecord;

// ============================================================================
// Query Client
// ============================================================================
//
// One GET per fetch against `{base}/orders/{order_id}`. Latency runs from
// dispatch until the whole body has been read, and is part of the outcome.
//
// Classification:
//   200 + decodable body  -> Found
//   200 + bad body        -> TransportError(Decode)
//   5xx                   -> TransportError(Status)
//   other non-200         -> NotFound
//   timeout / connect     -> TransportError
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("could not connect to query endpoint: {0}")]
    Connect(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("query endpoint answered with server error {0}")]
    Status(u16),

    #[error("response body is not an order record: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Request(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Found { record: OrderRecord, latency: Duration },
    NotFound { status: u16, latency: Duration },
    TransportError(QueryError),
}

/// Point read of an order by id. The verifier only sees this trait.
#[async_trait]
pub trait OrderQuery: Send + Sync {
    async fn fetch(&self, order_id: &str) -> QueryOutcome;
}

#[async_trait]
impl<Q: OrderQuery + ?Sized> OrderQuery for Arc<Q> {
    async fn fetch(&self, order_id: &str) -> QueryOutcome {
        (**self).fetch(order_id).await
    }
}

#[derive(Debug, Clone)]
pub struct HttpQueryClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpQueryClient {
    pub fn new(config: &QueryConfig) -> Result<Self, HarnessError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    fn order_url(&self, order_id: &str) -> String {
        format!("{}/orders/{}", self.base_url, order_id)
    }

    fn classify_error(&self, error: reqwest::Error) -> QueryError {
        if error.is_timeout() {
            QueryError::Timeout(self.timeout)
        } else if error.is_connect() {
            QueryError::Connect(error.to_string())
        } else if error.is_decode() || error.is_body() {
            QueryError::Decode(error.to_string())
        } else {
            QueryError::Request(error.to_string())
        }
    }
}

#[async_trait]
impl OrderQuery for HttpQueryClient {
    async fn fetch(&self, order_id: &str) -> QueryOutcome {
        let url = self.order_url(order_id);
        tracing::debug!(url = %url, "Fetching order");

        let started = Instant::now();

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return QueryOutcome::TransportError(self.classify_error(e)),
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return QueryOutcome::TransportError(self.classify_error(e)),
        };
        let latency = started.elapsed();

        if status == StatusCode::OK {
            return match serde_json::from_slice::<OrderRecord>(&body) {
                Ok(record) => QueryOutcome::Found { record, latency },
                Err(e) => QueryOutcome::TransportError(QueryError::Decode(e.to_string())),
            };
        }

        if status.is_server_error() {
            return QueryOutcome::TransportError(QueryError::Status(status.as_u16()));
        }

        tracing::warn!(
            order_id = %order_id,
            status = status.as_u16(),
            "⚠️ Order not found"
        );
        QueryOutcome::NotFound {
            status: status.as_u16(),
            latency,
        }
    }
}
