//! Tick coordinator
//!
//! One tick: fetch the manifest (with bounded retry), parse it, keep the
//! supported archive types, drop archives whose upstream hash matches the
//! committed hash, and fan the survivors out to concurrent pipelines. A
//! failing archive never cancels its siblings; manifest fetch failure is
//! the only error surfaced to the caller.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ManifestConfig;
use crate::ingest::archive::{ArchiveOutcome, ArchiveProcessor};
use crate::ingest::manifest::{self, ArchiveDescriptor};
use crate::store::HashStore;

/// Aggregated result of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Archives listed by the manifest after the type filter.
    pub listed: usize,
    /// Archives actually processed this tick (new or changed).
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Manifest lines that did not parse.
    pub malformed_lines: usize,
}

/// Drives manifest polling and archive fan-out
pub struct Coordinator {
    http: reqwest::Client,
    manifest: ManifestConfig,
    hash_store: HashStore,
    processor: Arc<ArchiveProcessor>,
}

impl Coordinator {
    pub fn new(
        http: reqwest::Client,
        manifest: ManifestConfig,
        hash_store: HashStore,
        processor: Arc<ArchiveProcessor>,
    ) -> Self {
        Self {
            http,
            manifest,
            hash_store,
            processor,
        }
    }

    /// Run one manifest tick.
    pub async fn tick(&self) -> Result<TickSummary> {
        info!("Starting archive check");

        let body = self.fetch_manifest().await?;
        let parsed = manifest::parse_manifest(&body);
        let malformed_lines = parsed.malformed;
        if malformed_lines > 0 {
            warn!(count = malformed_lines, "Manifest contained malformed lines");
        }

        let supported = manifest::supported_archives(parsed);
        info!(count = supported.len(), "Manifest listed supported archives");

        let to_process = self.select_archives(supported.clone()).await?;
        let summary_base = TickSummary {
            listed: supported.len(),
            processed: to_process.len(),
            malformed_lines,
            ..TickSummary::default()
        };

        if to_process.is_empty() {
            info!("No new or changed archives to process");
            return Ok(summary_base);
        }

        info!(count = to_process.len(), "Processing archives");
        let outcomes = self.process_all(to_process).await;

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = summary_base.processed - succeeded;
        for outcome in &outcomes {
            if let ArchiveOutcome::Failure { archive, message } = outcome {
                warn!(archive = %archive.file_name, message = %message, "Archive failed this tick");
            }
        }

        info!(succeeded, total = outcomes.len(), "Archive check finished");

        Ok(TickSummary {
            succeeded,
            failed,
            ..summary_base
        })
    }

    /// Fetch the manifest body, retrying transient failures with bounded
    /// exponential backoff.
    async fn fetch_manifest(&self) -> Result<String> {
        let retry = &self.manifest.retry;
        let max_period = Duration::from_millis(retry.max_period_ms);
        let mut backoff = Duration::from_millis(retry.period_ms);
        let mut last_error = None;

        for attempt in 1..=retry.max_attempts {
            match self.fetch_manifest_once().await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!(attempt, max_attempts = retry.max_attempts, error = %e, "Manifest fetch failed");
                    last_error = Some(e);

                    if attempt < retry.max_attempts {
                        debug!(backoff_ms = backoff.as_millis() as u64, "Retrying manifest fetch");
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(max_period);
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("manifest fetch failed with no recorded error")))
    }

    async fn fetch_manifest_once(&self) -> Result<String> {
        let response = self
            .http
            .get(&self.manifest.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch manifest from {}", self.manifest.url))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Manifest endpoint {} returned HTTP {}",
                self.manifest.url,
                response.status()
            );
        }

        response
            .text()
            .await
            .context("Failed to read manifest body")
    }

    /// Keep only archives whose upstream hash is new or changed. An archive
    /// with a matching committed hash causes no fetch, upload, or event.
    async fn select_archives(
        &self,
        archives: Vec<ArchiveDescriptor>,
    ) -> Result<Vec<ArchiveDescriptor>> {
        let mut selected = Vec::new();
        for archive in archives {
            let changed = self
                .hash_store
                .is_new_or_changed(&archive.file_name, &archive.hash)
                .await
                .context("Failed to check archive hash store")?;
            if changed {
                selected.push(archive);
            } else {
                debug!(archive = %archive.file_name, "Archive unchanged, skipping");
            }
        }
        Ok(selected)
    }

    /// Run one pipeline task per archive and wait for all of them. A panic
    /// or failure in one task never cancels the others.
    async fn process_all(&self, archives: Vec<ArchiveDescriptor>) -> Vec<ArchiveOutcome> {
        let handles: Vec<_> = archives
            .into_iter()
            .map(|archive| {
                let processor = Arc::clone(&self.processor);
                tokio::spawn(async move { processor.process(archive).await })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for result in futures::future::join_all(handles).await {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    // A panicked pipeline counts as a failure but we no
                    // longer know which archive it carried.
                    error!(error = %e, "Archive pipeline task aborted");
                }
            }
        }
        outcomes
    }
}
