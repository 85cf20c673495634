//! Manifest parsing
//!
//! The publisher manifest is a plain-text listing, one archive per line:
//!
//! ```text
//! <sizeBytes> <md5Hex> <url>
//! ```
//!
//! Fields are whitespace-separated; the URL tail after the last `/` is the
//! archive's identity key. Malformed lines are counted and skipped, never
//! fatal.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::publish::ArchiveKind;

/// One archive advertised by the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveDescriptor {
    /// URL tail after the last `/`; the archive's identity key.
    pub file_name: String,
    pub url: String,
    /// Publisher-asserted MD5 of the archive, hex.
    pub hash: String,
    pub size_bytes: i64,
}

/// Outcome of parsing a manifest body
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedManifest {
    pub archives: Vec<ArchiveDescriptor>,
    /// Non-blank lines that did not parse.
    pub malformed: usize,
}

/// Parse a manifest body into archive descriptors.
pub fn parse_manifest(body: &str) -> ParsedManifest {
    let mut parsed = ParsedManifest::default();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(descriptor) => parsed.archives.push(descriptor),
            None => {
                warn!(line = %line, "Skipping malformed manifest line");
                parsed.malformed += 1;
            }
        }
    }

    parsed
}

/// Filter descriptors to the archive types this collector consumes,
/// matching the patterns against the full URL.
pub fn supported_archives(parsed: ParsedManifest) -> Vec<ArchiveDescriptor> {
    parsed
        .archives
        .into_iter()
        .filter(|archive| ArchiveKind::from_name(&archive.url).is_some())
        .collect()
}

fn parse_line(line: &str) -> Option<ArchiveDescriptor> {
    let mut tokens = line.split_whitespace();
    let size_bytes: i64 = tokens.next()?.parse().ok()?;
    let hash = tokens.next()?.to_string();
    let url = tokens.next()?.to_string();

    let file_name = url.rsplit('/').next().unwrap_or(&url).to_string();
    if file_name.is_empty() {
        return None;
    }

    Some(ArchiveDescriptor {
        file_name,
        url,
        hash,
        size_bytes,
    })
}
