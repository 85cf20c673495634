//! Redis-backed persistence
//!
//! Two small keyspaces with independent TTLs:
//!
//! - `gdelt:archive:hash:{archiveName}` holds the last committed archive
//!   hash, written only after a fully successful pipeline run. Suppresses
//!   redundant reprocessing for the TTL window.
//! - `gdelt:file:info:{fileUrl}` holds per-object delivery status, flipped
//!   to sent on broker acknowledgment and swept by the retry scheduler
//!   while unsent.
//!
//! Both stores share a cloned [`redis::aio::ConnectionManager`]; keys are
//! logically owned by one archive pipeline at a time, so no locking is
//! needed.

pub mod hash;
pub mod status;

pub use hash::HashStore;
pub use status::{FileSendRecord, StatusStore};
