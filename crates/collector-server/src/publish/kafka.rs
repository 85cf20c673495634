//! Kafka URL publisher
//!
//! Fire-and-observe sends: each `send` spawns a task that awaits the broker
//! acknowledgment and only then marks the URL as sent in the status store.
//! A failed send changes nothing; the retry scheduler will pick the record
//! up again. The producer is configured idempotent, so retried sends cannot
//! reorder or duplicate within the broker's session guarantees.

use anyhow::{Context, Result};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::KafkaConfig;
use crate::store::StatusStore;

/// Asynchronous URL publisher backed by an idempotent Kafka producer
#[derive(Clone)]
pub struct MessagePublisher {
    producer: FutureProducer,
    status_store: StatusStore,
}

impl MessagePublisher {
    pub fn new(config: &KafkaConfig, status_store: StatusStore) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("enable.idempotence", "true")
            .set("message.timeout.ms", "30000")
            .create()
            .context("Failed to create Kafka producer")?;

        Ok(Self {
            producer,
            status_store,
        })
    }

    /// Enqueue a URL for the topic and observe the outcome in the
    /// background. On broker acknowledgment the URL's status record is
    /// marked sent exactly once; on failure the record is left untouched
    /// for the retry sweep. Callers do not block on delivery.
    pub fn send(&self, topic: String, url: String) -> JoinHandle<()> {
        let producer = self.producer.clone();
        let status_store = self.status_store.clone();

        tokio::spawn(async move {
            debug!(topic = %topic, url = %url, "Producing message");

            let record = FutureRecord::to(&topic).payload(&url).key("");
            match producer.send(record, Duration::from_secs(0)).await {
                Ok((partition, offset)) => {
                    debug!(topic = %topic, partition, offset, url = %url, "Broker acknowledged message");
                    match status_store.mark_sent(&url).await {
                        Ok(true) => {}
                        Ok(false) => {
                            // Record expired between registration and ack;
                            // the TTL bounds how long we track delivery.
                            warn!(url = %url, "Acknowledged URL had no status record");
                        }
                        Err(e) => {
                            warn!(url = %url, error = %e, "Failed to update send status");
                        }
                    }
                }
                Err((e, _message)) => {
                    error!(topic = %topic, url = %url, error = %e, "Failed to produce message");
                }
            }
        })
    }
}
