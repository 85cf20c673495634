//! Message-bus fan-out
//!
//! Resolves each archive to its destination topic by filename pattern and
//! publishes object URLs with an idempotent Kafka producer. Broker
//! acknowledgments flip the corresponding send-status records to sent.

pub mod kafka;
pub mod resolver;

pub use kafka::MessagePublisher;
pub use resolver::{ArchiveKind, TopicResolver};
