//! Per-object send-status store
//!
//! Tracks whether each produced object URL has been acknowledged by the
//! message broker. Records expire after a bounded TTL, which caps the retry
//! window: an unsent record that outlives the TTL is dropped.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

const KEY_PREFIX: &str = "gdelt:file:info:";

/// Delivery status of one produced object URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSendRecord {
    /// Archive the object was extracted from; used to re-resolve the topic
    /// during retry.
    pub archive_file_name: String,
    pub file_url: String,
    pub sent: bool,
}

/// Persistent mapping object-URL → [`FileSendRecord`]
#[derive(Clone)]
pub struct StatusStore {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl StatusStore {
    pub fn new(conn: ConnectionManager, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }

    /// Upsert a record with `sent = false`, marking publish intent.
    pub async fn register(&self, archive_file_name: &str, file_url: &str) -> Result<()> {
        let record = FileSendRecord {
            archive_file_name: archive_file_name.to_string(),
            file_url: file_url.to_string(),
            sent: false,
        };
        self.save(&record).await?;
        debug!(url = %file_url, archive = %archive_file_name, "Registered file for sending");
        Ok(())
    }

    /// Flip an existing record to `sent = true`, resetting its TTL.
    ///
    /// Returns `false` when no record exists for the URL (expired or never
    /// registered); an absent record is never resurrected.
    pub async fn mark_sent(&self, file_url: &str) -> Result<bool> {
        let Some(mut record) = self.get(file_url).await? else {
            warn!(url = %file_url, "Attempted to mark an unregistered file as sent");
            return Ok(false);
        };

        record.sent = true;
        self.save(&record).await?;
        debug!(url = %file_url, "Marked file as sent");
        Ok(true)
    }

    /// Fetch the record for a URL, if present.
    pub async fn get(&self, file_url: &str) -> Result<Option<FileSendRecord>> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(build_key(file_url)).await?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// All records with `sent = false`.
    ///
    /// Implemented as a prefix sweep; the result is a best-effort snapshot,
    /// not a transactional view. Records that vanish or fail to parse
    /// mid-sweep are skipped.
    pub async fn pending(&self) -> Result<Vec<FileSendRecord>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(format!("{KEY_PREFIX}*")).await?;

        let mut pending = Vec::new();
        for key in keys {
            let json: Option<String> = conn.get(&key).await?;
            let Some(json) = json else { continue };
            match serde_json::from_str::<FileSendRecord>(&json) {
                Ok(record) if !record.sent => pending.push(record),
                Ok(_) => {}
                Err(e) => warn!(key = %key, error = %e, "Skipping undecodable send-status record"),
            }
        }

        debug!(count = pending.len(), "Collected pending send-status records");
        Ok(pending)
    }

    async fn save(&self, record: &FileSendRecord) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(record)?;
        let _: () = conn
            .set_ex(build_key(&record.file_url), json, self.ttl_secs)
            .await?;
        Ok(())
    }
}

fn build_key(file_url: &str) -> String {
    format!("{KEY_PREFIX}{file_url}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_key_embeds_full_url() {
        assert_eq!(
            build_key("http://localhost:9000/gdelt/a.CSV"),
            "gdelt:file:info:http://localhost:9000/gdelt/a.CSV"
        );
    }

    #[test]
    fn test_record_round_trips_as_json() {
        let record = FileSendRecord {
            archive_file_name: "20250323151500.translation.export.CSV.zip".to_string(),
            file_url: "http://localhost:9000/gdelt/a.CSV".to_string(),
            sent: false,
        };
        let json = serde_json::to_string(&record).unwrap();
        let decoded: FileSendRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_record_rejects_garbage_json() {
        assert!(serde_json::from_str::<FileSendRecord>("not json").is_err());
    }
}
