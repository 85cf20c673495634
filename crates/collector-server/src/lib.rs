//! GDELT translation-archive collector
//!
//! A periodic ingestion worker for the GDELT feed publisher. Each tick it:
//!
//! 1. Fetches the publisher manifest listing the latest translation archives.
//! 2. Filters to supported archive types and to archives whose upstream hash
//!    differs from the last committed hash (Redis-backed provenance).
//! 3. Runs one pipeline per surviving archive, concurrently: download,
//!    MD5 verification, Zip-Slip-safe extraction, upload of every member to
//!    S3-compatible object storage.
//! 4. Announces each successful archive on an in-process event channel; the
//!    listener registers every produced object URL in the send-status store
//!    and publishes it to the archive type's Kafka topic.
//! 5. Commits the archive hash only after all derived objects are stored and
//!    publish intent is recorded.
//!
//! A separate retry loop periodically sweeps the send-status store for
//! unacknowledged URLs and re-publishes them, giving at-least-once delivery
//! bounded by the status-record TTL.
//!
//! # Stack
//!
//! - **Axum** for the control surface (manual trigger + health)
//! - **reqwest** for manifest and archive fetches
//! - **aws-sdk-s3** against MinIO or any S3-compatible endpoint
//! - **redis** for hash provenance and send-status records
//! - **rdkafka** for topic fan-out with an idempotent producer

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod publish;
pub mod storage;
pub mod store;

pub use error::CollectorError;
