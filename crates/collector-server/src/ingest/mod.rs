//! The ingestion pipeline
//!
//! Manifest polling → archive selection → per-archive concurrent
//! fetch/verify/extract/upload → event fan-out → hash commit, plus the
//! periodic schedulers driving it.

pub mod archive;
pub mod coordinator;
pub mod download;
pub mod events;
pub mod extract;
pub mod manifest;
pub mod scheduler;

pub use archive::{ArchiveOutcome, ArchiveProcessor};
pub use coordinator::{Coordinator, TickSummary};
pub use events::{EventBus, ExtractedEvent};
pub use manifest::ArchiveDescriptor;
