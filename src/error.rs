// ============================================================================
// Setup Errors
// ============================================================================
//
// Failures before the run starts or while tearing it down. Publish, query
// and verification failures are outcome values, not errors.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to create bus producer: {0}")]
    Producer(#[from] rdkafka::error::KafkaError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
