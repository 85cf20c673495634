//! Object storage configuration
//!
//! Settings for S3-compatible backends, primarily MinIO in this deployment.
//! Loadable from environment variables or constructed directly.
//!
//! Environment variables (first match wins):
//! - `STORAGE_S3_ENDPOINT` / `S3_ENDPOINT`: endpoint URL (default local MinIO)
//! - `STORAGE_S3_REGION` / `S3_REGION`: region (default "us-east-1")
//! - `STORAGE_S3_BUCKET` / `S3_BUCKET`: bucket (default "gdelt-archives")
//! - `STORAGE_S3_ACCESS_KEY` / `S3_ACCESS_KEY` / `AWS_ACCESS_KEY_ID`
//! - `STORAGE_S3_SECRET_KEY` / `S3_SECRET_KEY` / `AWS_SECRET_ACCESS_KEY`
//! - `STORAGE_S3_PATH_STYLE` / `S3_PATH_STYLE`: path-style addressing
//!   (default true, required for MinIO)

use serde::{Deserialize, Serialize};
use std::env;

/// Default endpoint for local development with MinIO.
pub const DEFAULT_S3_ENDPOINT: &str = "http://localhost:9000";

/// Default region when none is configured.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Default bucket for extracted archive members.
pub const DEFAULT_S3_BUCKET: &str = "gdelt-archives";

/// Default MinIO credentials for local development. Always override these
/// via environment variables in production.
pub const DEFAULT_MINIO_ACCESS_KEY: &str = "minioadmin";
pub const DEFAULT_MINIO_SECRET_KEY: &str = "minioadmin";

/// Configuration for the S3-compatible object store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Endpoint URL. Also the base of every synthesized object URL, so it
    /// must be reachable by downstream consumers.
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
}

impl StorageConfig {
    /// Load storage configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            endpoint: env::var("STORAGE_S3_ENDPOINT")
                .or_else(|_| env::var("S3_ENDPOINT"))
                .unwrap_or_else(|_| DEFAULT_S3_ENDPOINT.to_string()),
            region: env::var("STORAGE_S3_REGION")
                .or_else(|_| env::var("S3_REGION"))
                .unwrap_or_else(|_| DEFAULT_S3_REGION.to_string()),
            bucket: env::var("STORAGE_S3_BUCKET")
                .or_else(|_| env::var("S3_BUCKET"))
                .unwrap_or_else(|_| DEFAULT_S3_BUCKET.to_string()),
            access_key: env::var("STORAGE_S3_ACCESS_KEY")
                .or_else(|_| env::var("S3_ACCESS_KEY"))
                .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
                .unwrap_or_else(|_| DEFAULT_MINIO_ACCESS_KEY.to_string()),
            secret_key: env::var("STORAGE_S3_SECRET_KEY")
                .or_else(|_| env::var("S3_SECRET_KEY"))
                .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
                .unwrap_or_else(|_| DEFAULT_MINIO_SECRET_KEY.to_string()),
            path_style: env::var("STORAGE_S3_PATH_STYLE")
                .or_else(|_| env::var("S3_PATH_STYLE"))
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        })
    }

    /// Configuration for a local MinIO instance with default credentials.
    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: DEFAULT_S3_REGION.to_string(),
            bucket: bucket.into(),
            access_key: DEFAULT_MINIO_ACCESS_KEY.to_string(),
            secret_key: DEFAULT_MINIO_SECRET_KEY.to_string(),
            path_style: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_minio() {
        let config = StorageConfig::for_minio("http://localhost:9000", "test-bucket");
        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.bucket, "test-bucket");
        assert!(config.path_style);
        assert_eq!(config.access_key, DEFAULT_MINIO_ACCESS_KEY);
    }
}
