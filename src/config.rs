use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::HarnessError;
use crate::harness::FeedSettings;
use crate::messaging::{AckLevel, PublishSettings};
use crate::synthesizer::SynthesisMode;
use crate::utils::RetryConfig;

// ============================================================================
// Configuration
// ============================================================================
//
// Every flag can also come from a HARNESS_* environment variable. The parsed
// CLI is validated into a `HarnessConfig` before any client is created.
//
// ============================================================================

/// Validation harness for the order pipeline: publish orders to the bus and
/// check that the query endpoint's cache speeds up repeated reads.
#[derive(Parser, Debug)]
#[command(name = "order-cache-probe", version)]
pub struct Cli {
    /// Comma-separated Kafka bootstrap servers
    #[arg(long, env = "HARNESS_BROKERS", default_value = "localhost:9092")]
    pub brokers: String,

    #[arg(long, env = "HARNESS_TOPIC", default_value = "orders")]
    pub topic: String,

    /// Base URL of the order query endpoint
    #[arg(long, env = "HARNESS_QUERY_URL", default_value = "http://localhost:8081")]
    pub query_url: String,

    /// Upper bound for one publish, retries included
    #[arg(long, env = "HARNESS_PUBLISH_TIMEOUT_SECS", default_value_t = 10)]
    pub publish_timeout_secs: u64,

    /// Total delivery attempts per publish
    #[arg(long, env = "HARNESS_PUBLISH_ATTEMPTS", default_value_t = 3)]
    pub publish_attempts: u32,

    /// Backoff before the first retry; doubles per retry
    #[arg(long, env = "HARNESS_RETRY_BACKOFF_MS", default_value_t = 100)]
    pub retry_backoff_ms: u64,

    #[arg(long, env = "HARNESS_QUERY_TIMEOUT_SECS", default_value_t = 10)]
    pub query_timeout_secs: u64,

    /// Wait between publishing and the cold read
    #[arg(long, env = "HARNESS_SETTLE_MS", default_value_t = 2000)]
    pub settle_ms: u64,

    /// Unverified records published after the verification
    #[arg(long, env = "HARNESS_BULK_COUNT", default_value_t = 3)]
    pub bulk_count: usize,

    /// Write Prometheus text metrics here at the end of the run
    #[arg(long, env = "HARNESS_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Publish one order, verify the cache effect, then publish a few more (default)
    Verify,

    /// Publish generated orders at a fixed interval
    Produce {
        /// How many orders to send (0 = until Ctrl-C)
        #[arg(short = 'n', long, default_value_t = 10)]
        count: u64,

        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Send the fixed reference order instead of randomized ones
        #[arg(long)]
        template: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusConfig {
    pub brokers: String,
    pub acks: AckLevel,
    pub message_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub bus: BusConfig,
    pub query: QueryConfig,
    pub topic: String,
    pub publish: PublishSettings,
    pub settle_interval: Duration,
    pub bulk_count: usize,
    pub metrics_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Verify,
    Produce(FeedSettings),
}

impl Cli {
    pub fn mode(&self) -> Mode {
        match &self.command {
            None | Some(Command::Verify) => Mode::Verify,
            Some(Command::Produce { count, interval_ms, template }) => Mode::Produce(FeedSettings {
                count: *count,
                interval: Duration::from_millis(*interval_ms),
                synthesis: if *template {
                    SynthesisMode::Template
                } else {
                    SynthesisMode::Randomized
                },
            }),
        }
    }

    pub fn harness_config(&self) -> Result<HarnessConfig, HarnessError> {
        let brokers = self.brokers.trim();
        if brokers.split(',').all(|b| b.trim().is_empty()) {
            return Err(HarnessError::Config("no brokers provided".to_string()));
        }
        if self.topic.trim().is_empty() {
            return Err(HarnessError::Config("topic must not be empty".to_string()));
        }
        if self.publish_attempts == 0 {
            return Err(HarnessError::Config("publish attempts must be at least 1".to_string()));
        }
        if self.publish_timeout_secs == 0 {
            return Err(HarnessError::Config("publish timeout must be positive".to_string()));
        }

        let url = reqwest::Url::parse(&self.query_url)
            .map_err(|e| HarnessError::Config(format!("invalid query url {}: {}", self.query_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HarnessError::Config(format!(
                "query url must be http or https, got {}",
                url.scheme()
            )));
        }

        let ack_timeout = Duration::from_secs(self.publish_timeout_secs);
        // 0 would mean "no limit" to librdkafka
        let attempt_timeout = (ack_timeout / self.publish_attempts).max(Duration::from_millis(1));

        Ok(HarnessConfig {
            bus: BusConfig {
                brokers: brokers.to_string(),
                acks: AckLevel::AllReplicas,
                message_timeout: attempt_timeout,
            },
            query: QueryConfig {
                base_url: self.query_url.clone(),
                timeout: Duration::from_secs(self.query_timeout_secs),
            },
            topic: self.topic.clone(),
            publish: PublishSettings {
                required_ack: AckLevel::AllReplicas,
                ack_timeout,
                retry: RetryConfig {
                    initial_delay: Duration::from_millis(self.retry_backoff_ms),
                    ..RetryConfig::default()
                }
                .with_max_attempts(self.publish_attempts),
            },
            settle_interval: Duration::from_millis(self.settle_ms),
            bulk_count: self.bulk_count,
            metrics_file: self.metrics_file.clone(),
        })
    }
}
