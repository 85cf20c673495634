//! In-process extraction events
//!
//! A typed channel connects the archive pipeline to the publishing side:
//! the pipeline announces each successfully uploaded archive exactly once,
//! and a listener task registers every produced URL for delivery tracking
//! and hands it to the Kafka publisher. Handler invocation is asynchronous
//! and ordering across events is not guaranteed.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::ingest::manifest::ArchiveDescriptor;
use crate::publish::{MessagePublisher, TopicResolver};
use crate::store::StatusStore;

/// Emitted once per successfully processed archive, after every member has
/// been uploaded and before the archive hash is committed.
#[derive(Debug, Clone)]
pub struct ExtractedEvent {
    pub archive: ArchiveDescriptor,
    /// Object URLs of the uploaded members, in extraction order. May be
    /// empty for an archive with no file entries.
    pub file_urls: Vec<String>,
}

/// Sending half of the extraction event channel
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<ExtractedEvent>,
}

impl EventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExtractedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish an event to the listener. Failure means the listener is gone
    /// (shutdown); the event is logged and dropped.
    pub fn publish(&self, event: ExtractedEvent) {
        if let Err(e) = self.tx.send(event) {
            error!(archive = %e.0.archive.file_name, "Event listener is gone, dropping extraction event");
        }
    }
}

/// Spawn the listener task draining extraction events.
///
/// Each event is handled on its own task: the topic is resolved from the
/// archive name, then every URL is registered in the status store and sent
/// to the publisher. An unclassifiable archive fails the whole event.
pub fn spawn_listener(
    mut rx: mpsc::UnboundedReceiver<ExtractedEvent>,
    resolver: TopicResolver,
    status_store: StatusStore,
    publisher: MessagePublisher,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Extraction event listener started");
        while let Some(event) = rx.recv().await {
            let resolver = resolver.clone();
            let status_store = status_store.clone();
            let publisher = publisher.clone();
            tokio::spawn(async move {
                handle_event(event, &resolver, &status_store, &publisher).await;
            });
        }
        info!("Extraction event listener stopped");
    })
}

async fn handle_event(
    event: ExtractedEvent,
    resolver: &TopicResolver,
    status_store: &StatusStore,
    publisher: &MessagePublisher,
) {
    info!(
        archive = %event.archive.file_name,
        urls = event.file_urls.len(),
        "Handling extraction event"
    );

    let topic = match resolver.resolve(&event.archive.file_name) {
        Ok(topic) => topic.to_string(),
        Err(e) => {
            error!(archive = %event.archive.file_name, error = %e, "Dropping event for unclassifiable archive");
            return;
        }
    };

    for url in &event.file_urls {
        // A failed registration is non-fatal: the send still goes out, the
        // record just will not be retried if the broker never acks.
        if let Err(e) = status_store.register(&event.archive.file_name, url).await {
            warn!(url = %url, error = %e, "Failed to register send-status record");
        }
        publisher.send(topic.clone(), url.clone());
    }
}
