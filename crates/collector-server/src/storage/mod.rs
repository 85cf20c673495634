//! S3-compatible object store
//!
//! Holds one extracted archive member per object, keyed by the member's
//! basename, in a single bucket. Construction verifies the bucket exists
//! (creating it when absent) and is fatal on failure so the service never
//! accepts work it cannot store.

use anyhow::{Context, Result};
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    primitives::ByteStream,
    Client,
};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::CollectorError;

pub mod config;

pub use config::StorageConfig;

/// Client for the archive-member bucket
#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
    bucket: String,
    endpoint: String,
}

impl ObjectStore {
    /// Build the client and ensure the destination bucket exists.
    pub async fn new(config: StorageConfig) -> Result<Self> {
        debug!(endpoint = %config.endpoint, bucket = %config.bucket, "Initializing object store");

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "collector-storage",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .force_path_style(config.path_style)
            .build();

        let store = Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket,
            endpoint: config.endpoint,
        };

        store.ensure_bucket().await?;

        info!(bucket = %store.bucket, "Object store initialized");

        Ok(store)
    }

    /// Check the bucket exists, creating it when absent.
    async fn ensure_bucket(&self) -> Result<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                debug!(bucket = %self.bucket, "Bucket already exists");
                Ok(())
            }
            Err(e) => {
                info!(bucket = %self.bucket, error = %e, "Bucket not reachable, attempting creation");
                self.client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .with_context(|| format!("Failed to create bucket '{}'", self.bucket))?;
                info!(bucket = %self.bucket, "Bucket created");
                Ok(())
            }
        }
    }

    /// Upload a local file under the given object name and return its URL.
    ///
    /// Content length is taken from file metadata; content type is derived
    /// from the file extension, defaulting to `application/octet-stream`.
    pub async fn upload_file(
        &self,
        object_name: &str,
        path: &Path,
    ) -> Result<String, CollectorError> {
        debug!(object = %object_name, file = %path.display(), "Uploading to object store");

        let size = tokio::fs::metadata(path).await?.len();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| CollectorError::storage(format!("failed to read {}: {e}", path.display())))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object_name)
            .body(body)
            .content_length(size as i64)
            .content_type(content_type_for(path))
            .send()
            .await
            .map_err(|e| {
                CollectorError::storage(format!("failed to upload '{object_name}': {e}"))
            })?;

        let url = self.object_url(object_name);
        info!(object = %object_name, size_bytes = size, url = %url, "Uploaded object");

        Ok(url)
    }

    /// Delete an object from the bucket.
    pub async fn delete(&self, object_name: &str) -> Result<(), CollectorError> {
        debug!(object = %object_name, "Deleting object");

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(object_name)
            .send()
            .await
            .map_err(|e| {
                CollectorError::storage(format!("failed to delete '{object_name}': {e}"))
            })?;

        Ok(())
    }

    /// Synthesize the public URL of an object: `{endpoint}/{bucket}/{name}`.
    ///
    /// Reachability depends on the bucket's access policy; the collector
    /// only promises the shape of the URL.
    pub fn object_url(&self, object_name: &str) -> String {
        build_object_url(&self.endpoint, &self.bucket, object_name)
    }

    /// Extract the object name back out of a synthesized URL.
    pub fn object_name_from_url(url: &str) -> Option<&str> {
        url.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Best-effort rollback of already-uploaded objects after a failed batch.
    /// Individual delete failures are logged and do not stop the sweep.
    pub async fn delete_urls_best_effort(&self, urls: &[String]) {
        if urls.is_empty() {
            return;
        }
        warn!(count = urls.len(), "Rolling back uploaded objects");
        for url in urls {
            match Self::object_name_from_url(url) {
                Some(object_name) => {
                    if let Err(e) = self.delete(object_name).await {
                        warn!(object = %object_name, error = %e, "Rollback delete failed");
                    }
                }
                None => warn!(url = %url, "Could not derive object name from URL for rollback"),
            }
        }
    }
}

/// `{endpoint}/{bucket}/{object}` with a single slash separator.
fn build_object_url(endpoint: &str, bucket: &str, object_name: &str) -> String {
    format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, object_name)
}

/// Detect a content type from the file extension.
fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_object_url() {
        assert_eq!(
            build_object_url("http://localhost:9000", "gdelt", "a.CSV"),
            "http://localhost:9000/gdelt/a.CSV"
        );
    }

    #[test]
    fn test_build_object_url_trims_trailing_slash() {
        assert_eq!(
            build_object_url("http://localhost:9000/", "gdelt", "a.CSV"),
            "http://localhost:9000/gdelt/a.CSV"
        );
    }

    #[test]
    fn test_object_name_from_url() {
        let url = "http://localhost:9000/gdelt/20250323151500.translation.export.CSV";
        assert_eq!(
            ObjectStore::object_name_from_url(url),
            Some("20250323151500.translation.export.CSV")
        );
        assert_eq!(ObjectStore::object_name_from_url("http://host/bucket/"), None);
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.CSV")), "text/csv");
        assert_eq!(content_type_for(Path::new("a.json")), "application/json");
        assert_eq!(content_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(content_type_for(Path::new("blob")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
    }
}
