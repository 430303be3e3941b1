//! Bucket store: owns the category root directories and their period
//! subdirectories.
//!
//! Layout per category root:
//!
//! ```text
//! <root>/
//!   <bucketName>/           # e.g. 2024-03-15, 2024-W11, 2024-03
//!     ...output files...
//!   archive/
//!     <bucketName>_<YYYYMMDD_HHMMSS>.zip
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::debug;

use cardscan_core::calendar::bucket_name;
use cardscan_core::config::{OutputCategory, RotationConfig, RotationGranularity};
use cardscan_core::CoreResult;

/// Name of the per-category archive subdirectory. Never treated as a bucket.
pub const ARCHIVE_DIR: &str = "archive";

/// One period directory eligible for archival consideration.
#[derive(Debug, Clone)]
pub struct CandidateBucket {
    /// Directory name, which normally encodes the period.
    pub name: String,
    /// Absolute path of the bucket directory.
    pub path: PathBuf,
    /// Last-modified timestamp, the age fallback for unparseable names.
    pub modified: NaiveDateTime,
}

/// Owns the category roots and resolves the active bucket for "now".
///
/// Construction provisions both roots and their `archive/` subdirectories.
/// The store only ever creates directories; archival (which deletes) lives
/// in [`crate::archiver`].
#[derive(Debug)]
pub struct BucketStore {
    log_root: PathBuf,
    response_root: PathBuf,
    granularity: RotationGranularity,
}

impl BucketStore {
    /// Create the store and provision the on-disk layout.
    ///
    /// # Errors
    ///
    /// Returns an error if any root or archive directory cannot be created.
    pub fn new(config: &RotationConfig) -> CoreResult<Self> {
        let store = Self {
            log_root: config.log_root.clone(),
            response_root: config.response_root.clone(),
            granularity: config.granularity,
        };

        for category in OutputCategory::ALL {
            fs::create_dir_all(store.root(category))?;
            fs::create_dir_all(store.archive_dir(category))?;
        }

        Ok(store)
    }

    /// Root directory of a category.
    pub fn root(&self, category: OutputCategory) -> &Path {
        match category {
            OutputCategory::Logs => &self.log_root,
            OutputCategory::Responses => &self.response_root,
        }
    }

    /// Archive directory of a category.
    pub fn archive_dir(&self, category: OutputCategory) -> PathBuf {
        self.root(category).join(ARCHIVE_DIR)
    }

    /// Path of the bucket covering `now`, created if absent.
    ///
    /// Safe to call concurrently from multiple writer contexts: creating an
    /// already-existing directory is not an error.
    pub fn active_bucket_path(
        &self,
        category: OutputCategory,
        now: NaiveDateTime,
    ) -> CoreResult<PathBuf> {
        let name = bucket_name(now.date(), self.granularity);
        let path = self.root(category).join(name);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Bucket directory for the current wall-clock period. Guaranteed to
    /// exist after the call returns and stable for the remainder of the
    /// period. This is the only operation output writers use.
    pub fn current_bucket_dir(&self, category: OutputCategory) -> CoreResult<PathBuf> {
        self.active_bucket_path(category, Local::now().naive_local())
    }

    /// List the period subdirectories of a category root, excluding the
    /// literal `archive` entry. Reflects filesystem state at call time.
    pub fn list_candidates(&self, category: OutputCategory) -> CoreResult<Vec<CandidateBucket>> {
        let mut candidates = Vec::new();

        for entry in fs::read_dir(self.root(category))? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if name == ARCHIVE_DIR {
                continue;
            }

            let modified = entry.metadata()?.modified()?;
            candidates.push(CandidateBucket {
                name,
                path: entry.path(),
                modified: DateTime::<Local>::from(modified).naive_local(),
            });
        }

        debug!(
            category = %category,
            count = candidates.len(),
            "listed candidate buckets"
        );
        Ok(candidates)
    }
}
