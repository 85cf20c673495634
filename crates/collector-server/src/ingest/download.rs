//! HTTP downloads and directory management
//!
//! Streaming archive downloads with a shared, timeout-configured client.
//! Bodies are copied chunk-by-chunk to disk, so memory use is independent
//! of archive size.

use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::ManifestConfig;
use crate::error::{CollectorError, Result};

const USER_AGENT: &str = concat!("gdelt-collector/", env!("CARGO_PKG_VERSION"));

/// Build the shared outbound HTTP client. Follows redirects and applies the
/// configured connect and read timeouts. The read timeout is per socket
/// read, not per request, so long archive downloads are never cut off while
/// data keeps flowing.
pub fn build_http_client(config: &ManifestConfig) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .read_timeout(config.read_timeout())
        .user_agent(USER_AGENT)
        .build()
}

/// Download a URL to `target`, truncating any existing file. The parent
/// directory is created when missing. Non-2xx responses and socket faults
/// surface as [`CollectorError::Transport`].
pub async fn download(client: &Client, url: &str, target: &Path) -> Result<PathBuf> {
    info!(url = %url, target = %target.display(), "Starting download");

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CollectorError::transport(url, e))?;

    if !response.status().is_success() {
        return Err(CollectorError::transport(
            url,
            format!("HTTP status {}", response.status()),
        ));
    }

    let mut file = tokio::fs::File::create(target).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| CollectorError::transport(url, e))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    info!(url = %url, bytes = written, "Download complete");
    Ok(target.to_path_buf())
}

/// Create a directory (and parents) when missing; idempotent. Fails when
/// the path exists as something other than a directory.
pub async fn ensure_dir(path: &Path) -> Result<PathBuf> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(path.to_path_buf()),
        Ok(_) => Err(CollectorError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a directory", path.display()),
        ))),
        Err(_) => {
            debug!(dir = %path.display(), "Creating directory");
            tokio::fs::create_dir_all(path).await?;
            Ok(path.to_path_buf())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    #[test]
    fn test_client_builds_from_default_config() {
        let config = Config::default();
        assert!(build_http_client(&config.manifest).is_ok());
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_nested_dirs() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b/c");

        let created = ensure_dir(&nested).await.unwrap();
        assert_eq!(created, nested);
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        ensure_dir(tmp.path()).await.unwrap();
        ensure_dir(tmp.path()).await.unwrap();
        assert!(tmp.path().is_dir());
    }

    #[tokio::test]
    async fn test_ensure_dir_rejects_existing_file() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("occupied");
        tokio::fs::write(&file_path, b"x").await.unwrap();

        let result = ensure_dir(&file_path).await;
        assert!(matches!(result, Err(CollectorError::Io(_))));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_download_real_manifest() {
        let config = Config::default();
        let client = build_http_client(&config.manifest).unwrap();
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("lastupdate-translation.txt");

        let path = download(&client, &config.manifest.url, &target)
            .await
            .unwrap();
        let body = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!body.is_empty());
    }
}
