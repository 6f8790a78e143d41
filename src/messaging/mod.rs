pub mod bus;
mod kafka;
pub mod publisher;

pub use bus::{AckLevel, BusError, BusTransport};
pub use kafka::KafkaTransport;
pub use publisher::{BusPublisher, PublishFailure, PublishResult, PublishSettings};
