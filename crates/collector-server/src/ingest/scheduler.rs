//! Periodic schedulers
//!
//! Two background loops:
//!
//! - the **check loop** runs a coordinator tick every check interval;
//! - the **retry loop** sweeps the status store for unacknowledged URLs and
//!   re-publishes them, without deduplication (downstream idempotence and
//!   consumer-side dedup absorb repeats).
//!
//! Both loops log failures and keep running; they stop when aborted at
//! shutdown.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::ingest::coordinator::Coordinator;
use crate::publish::{MessagePublisher, TopicResolver};
use crate::store::StatusStore;

/// Spawn the periodic manifest-check loop.
pub fn spawn_check_loop(coordinator: Arc<Coordinator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Archive check loop started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match coordinator.tick().await {
                Ok(summary) => {
                    info!(
                        listed = summary.listed,
                        processed = summary.processed,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        "Scheduled archive check completed"
                    );
                }
                Err(e) => error!(error = %e, "Scheduled archive check failed"),
            }
        }
    })
}

/// Spawn the periodic send-retry loop.
pub fn spawn_retry_loop(
    status_store: StatusStore,
    resolver: TopicResolver,
    publisher: MessagePublisher,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Send retry loop started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick fires immediately; skip it so fresh sends
        // get a chance to be acknowledged before the first sweep.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match retry_pending(&status_store, &resolver, &publisher).await {
                Ok(0) => {}
                Ok(count) => info!(count, "Re-published pending files"),
                Err(e) => error!(error = %e, "Send retry sweep failed"),
            }
        }
    })
}

/// Re-publish every record still marked unsent. Returns the number of
/// re-publish attempts issued.
async fn retry_pending(
    status_store: &StatusStore,
    resolver: &TopicResolver,
    publisher: &MessagePublisher,
) -> Result<usize> {
    let pending = status_store.pending().await?;
    if pending.is_empty() {
        return Ok(0);
    }

    info!(count = pending.len(), "Found files pending re-publication");

    let mut attempted = 0;
    for record in pending {
        match resolver.resolve(&record.archive_file_name) {
            Ok(topic) => {
                publisher.send(topic.to_string(), record.file_url.clone());
                attempted += 1;
            }
            Err(e) => {
                // Unresolvable records stay unsent until their TTL drops them.
                warn!(
                    archive = %record.archive_file_name,
                    url = %record.file_url,
                    error = %e,
                    "Cannot resolve topic for pending file"
                );
            }
        }
    }

    Ok(attempted)
}
