//! MD5 checksum utilities for archive verification
//!
//! The GDELT manifest asserts an MD5 per archive; downloads are verified
//! against it before extraction. File digests are computed with a bounded
//! buffer so memory usage stays independent of archive size.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Read buffer for streaming digests.
const BUFFER_SIZE: usize = 8192;

/// Compute the MD5 checksum of a byte slice as a lowercase hex string.
pub fn compute_md5(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Compute the MD5 checksum of a file with buffered streaming reads.
pub async fn compute_file_md5(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mut context = md5::Context::new();
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let read = file
            .read(&mut buffer)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }

    Ok(format!("{:x}", context.compute()))
}

/// Verify a file's MD5 against an expected value, case-insensitively.
pub async fn verify_file_md5(path: &Path, expected_md5: &str) -> Result<bool> {
    let computed = compute_file_md5(path).await?;
    Ok(computed.eq_ignore_ascii_case(expected_md5))
}
