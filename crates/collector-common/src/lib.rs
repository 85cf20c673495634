//! Shared plumbing for the GDELT collector services.
//!
//! Keeps the concerns that are independent of the collector itself:
//!
//! - **Logging**: a centralized `tracing` setup with environment-based
//!   configuration (level, format, console/file output).
//! - **Checksums**: streaming MD5 digests used to verify downloaded
//!   archives against the publisher-supplied hashes.

pub mod checksum;
pub mod logging;
