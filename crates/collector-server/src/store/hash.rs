//! Archive hash provenance store

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::error::Result;

const KEY_PREFIX: &str = "gdelt:archive:hash:";

/// Persistent mapping archive-name → last committed archive hash
#[derive(Clone)]
pub struct HashStore {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl HashStore {
    pub fn new(conn: ConnectionManager, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }

    /// The stored hash for an archive, if any.
    pub async fn stored(&self, archive_name: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let hash: Option<String> = conn.get(build_key(archive_name)).await?;
        debug!(archive = %archive_name, hash = ?hash, "Fetched stored archive hash");
        Ok(hash)
    }

    /// Commit an archive hash. Called only after every derived object of the
    /// archive has been materialized in the object store.
    pub async fn put(&self, archive_name: &str, hash: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(build_key(archive_name), hash, self.ttl_secs).await?;
        debug!(archive = %archive_name, hash = %hash, ttl_secs = self.ttl_secs, "Stored archive hash");
        Ok(())
    }

    /// True iff the archive has no stored hash or the stored hash differs.
    pub async fn is_new_or_changed(&self, archive_name: &str, current_hash: &str) -> Result<bool> {
        let stored = self.stored(archive_name).await?;
        let changed = stored.as_deref() != Some(current_hash);
        debug!(
            archive = %archive_name,
            stored = ?stored,
            current = %current_hash,
            changed,
            "Checked archive freshness"
        );
        Ok(changed)
    }
}

fn build_key(archive_name: &str) -> String {
    format!("{KEY_PREFIX}{archive_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_key() {
        assert_eq!(
            build_key("20250323151500.translation.export.CSV.zip"),
            "gdelt:archive:hash:20250323151500.translation.export.CSV.zip"
        );
    }

    // Store behavior against a live Redis is covered by the ignored
    // integration tests in tests/stack_integration.rs.
}
