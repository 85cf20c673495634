//! The per-archive pipeline
//!
//! Runs one archive end to end: download, MD5 verification, safe
//! extraction, member upload, event announcement, hash commit, cleanup.
//! The ordering is load-bearing:
//!
//! - the hash is committed only after every member is safely in the object
//!   store, so a committed hash always has materialized artifacts behind it;
//! - the extraction event is published *before* the commit, so a crash
//!   between the two can only produce unannounced objects (reprocessed next
//!   tick), never a committed archive nobody heard about;
//! - the temp extraction directory is removed on every exit path via a drop
//!   guard, including cancellation mid-pipeline.
//!
//! Failures never escape as errors: they are reduced to
//! [`ArchiveOutcome::Failure`] and counted by the coordinator. The
//! processor is stateless across archives; concurrent pipelines share
//! nothing mutable.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{CollectorError, Result};
use crate::ingest::download;
use crate::ingest::events::{EventBus, ExtractedEvent};
use crate::ingest::extract::{self, ExtractDirGuard};
use crate::ingest::manifest::ArchiveDescriptor;
use crate::storage::ObjectStore;
use crate::store::HashStore;

/// Result of one archive pipeline run
#[derive(Debug, Clone)]
pub enum ArchiveOutcome {
    Success {
        archive: ArchiveDescriptor,
        file_urls: Vec<String>,
    },
    Failure {
        archive: ArchiveDescriptor,
        message: String,
    },
}

impl ArchiveOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ArchiveOutcome::Success { .. })
    }
}

/// Stateless executor for single-archive pipelines
pub struct ArchiveProcessor {
    download_dir: PathBuf,
    http: reqwest::Client,
    hash_store: HashStore,
    object_store: ObjectStore,
    events: EventBus,
}

impl ArchiveProcessor {
    pub fn new(
        download_dir: PathBuf,
        http: reqwest::Client,
        hash_store: HashStore,
        object_store: ObjectStore,
        events: EventBus,
    ) -> Arc<Self> {
        Arc::new(Self {
            download_dir,
            http,
            hash_store,
            object_store,
            events,
        })
    }

    /// Run the full pipeline for one archive.
    pub async fn process(&self, archive: ArchiveDescriptor) -> ArchiveOutcome {
        info!(archive = %archive.file_name, "Starting archive processing");

        let extract_dir = match ExtractDirGuard::create(&self.download_dir, &archive.file_name) {
            Ok(guard) => guard,
            Err(e) => {
                error!(archive = %archive.file_name, error = %e, "Failed to create extraction directory");
                return ArchiveOutcome::Failure {
                    archive,
                    message: e.to_string(),
                };
            }
        };

        let result = self.run_pipeline(&archive, extract_dir.path()).await;

        // `extract_dir` drops here, deleting the temp directory on success
        // and failure alike.
        match result {
            Ok(file_urls) => {
                info!(archive = %archive.file_name, files = file_urls.len(), "Archive processed");
                ArchiveOutcome::Success { archive, file_urls }
            }
            Err(e) => {
                error!(archive = %archive.file_name, error = %e, "Archive processing failed");
                ArchiveOutcome::Failure {
                    archive,
                    message: e.to_string(),
                }
            }
        }
    }

    async fn run_pipeline(
        &self,
        archive: &ArchiveDescriptor,
        extract_dir: &Path,
    ) -> Result<Vec<String>> {
        download::ensure_dir(&self.download_dir).await?;

        let archive_path = self.download_dir.join(&archive.file_name);
        download::download(&self.http, &archive.url, &archive_path).await?;

        self.verify_hash(archive, &archive_path).await?;

        let members = extract::extract_zip(&archive_path, extract_dir).await?;
        let file_urls = self.upload_members(&members).await?;

        // Announce before committing: an unannounced commit would strand
        // the uploaded objects with no downstream notification.
        self.events.publish(ExtractedEvent {
            archive: archive.clone(),
            file_urls: file_urls.clone(),
        });

        self.hash_store.put(&archive.file_name, &archive.hash).await?;
        debug!(archive = %archive.file_name, "Committed archive hash");

        if let Err(e) = tokio::fs::remove_file(&archive_path).await {
            warn!(archive = %archive.file_name, error = %e, "Failed to remove downloaded archive");
        }

        Ok(file_urls)
    }

    async fn verify_hash(&self, archive: &ArchiveDescriptor, archive_path: &Path) -> Result<()> {
        let computed = collector_common::checksum::compute_file_md5(archive_path)
            .await
            .map_err(|e| {
                CollectorError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            })?;

        if !computed.eq_ignore_ascii_case(&archive.hash) {
            return Err(CollectorError::HashMismatch {
                computed,
                expected: archive.hash.clone(),
            });
        }

        debug!(archive = %archive.file_name, "Archive hash verified");
        Ok(())
    }

    /// Upload every extracted member under its basename, deleting the local
    /// copy after each successful upload. On any upload failure, previously
    /// uploaded objects of this archive are deleted best-effort and the
    /// archive fails.
    async fn upload_members(&self, members: &[PathBuf]) -> Result<Vec<String>> {
        let mut uploaded = Vec::with_capacity(members.len());

        for member in members {
            let object_name = member
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    CollectorError::storage(format!("member has no filename: {}", member.display()))
                })?;

            match self.object_store.upload_file(&object_name, member).await {
                Ok(url) => {
                    uploaded.push(url);
                    if let Err(e) = tokio::fs::remove_file(member).await {
                        warn!(file = %member.display(), error = %e, "Failed to remove extracted member");
                    }
                }
                Err(e) => {
                    self.object_store.delete_urls_best_effort(&uploaded).await;
                    return Err(e);
                }
            }
        }

        Ok(uploaded)
    }
}
