//! Period-keyed rotation and archival engine for cardscan output files.
//!
//! Ongoing output (operational logs, saved response payloads) is partitioned
//! into time-bucketed directories named after the configured rotation period.
//! A background scheduler sweeps old buckets into compressed archives and
//! enforces retention by bucket age.

pub mod archiver;
pub mod error;
pub mod policy;
pub mod scheduler;
pub mod store;
pub mod writer;

pub use archiver::{archive_bucket, ArchiveEntry};
pub use error::{Error, Result};
pub use policy::RotationPolicy;
pub use scheduler::{CategorySweep, RotationScheduler, SweepReport};
pub use store::{BucketStore, CandidateBucket, ARCHIVE_DIR};
pub use writer::{OutputWriter, RecordKind};
