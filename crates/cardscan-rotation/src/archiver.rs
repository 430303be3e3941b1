//! All-or-nothing bucket archival.
//!
//! A bucket's file tree is compressed into a single deflate ZIP under the
//! category's `archive/` directory, and the source tree is removed only
//! after the container has been fully written and closed. A failed or
//! partial archive is discarded so a retry sees the same candidate again.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use cardscan_core::{CoreError, CoreResult};

/// The compressed file produced for one bucket. Immutable once written.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Name of the archived bucket.
    pub bucket: String,
    /// Path of the ZIP file under the archive directory.
    pub path: PathBuf,
    /// Number of regular files stored in the container.
    pub files: usize,
}

/// Archive `source` into `archive_dir` and remove the source tree.
///
/// The ZIP is named `{bucket}_{YYYYMMDD_HHMMSS}.zip` using `now`, and every
/// regular file in the bucket is stored under `{bucket}/{relativePath}`.
/// Symlinks and special files are skipped. An empty bucket produces an
/// empty container rather than being skipped, so forced cleanup leaves no
/// period directory behind.
///
/// # Errors
///
/// - [`CoreError::ArchiveWrite`]: the container could not be written; the
///   partial file has been removed and the source bucket is untouched.
/// - [`CoreError::SourceRemoval`]: the container was written but the source
///   tree could not be deleted; the bucket will be seen again next sweep.
pub fn archive_bucket(
    source: &Path,
    archive_dir: &Path,
    now: NaiveDateTime,
) -> CoreResult<ArchiveEntry> {
    let bucket = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::invalid_state(format!("invalid bucket path: {}", source.display())))?
        .to_owned();

    fs::create_dir_all(archive_dir)?;
    let zip_path = archive_dir.join(format!("{}_{}.zip", bucket, now.format("%Y%m%d_%H%M%S")));

    info!(
        bucket = %bucket,
        archive = %zip_path.display(),
        "archiving bucket"
    );

    let files = match write_container(source, &bucket, &zip_path) {
        Ok(files) => files,
        Err(e) => {
            // Discard the partial container so a retry starts clean.
            if let Err(rm) = fs::remove_file(&zip_path) {
                if rm.kind() != io::ErrorKind::NotFound {
                    warn!(
                        archive = %zip_path.display(),
                        error = %rm,
                        "failed to remove partial archive"
                    );
                }
            }
            return Err(CoreError::archive_write(bucket, e));
        }
    };

    if let Err(e) = fs::remove_dir_all(source) {
        return Err(CoreError::source_removal(bucket, &zip_path, e));
    }

    info!(bucket = %bucket, files, "archived and removed bucket");
    Ok(ArchiveEntry {
        bucket,
        path: zip_path,
        files,
    })
}

/// Write the ZIP container for one bucket, returning the file count.
/// Entries are rooted one level above the bucket, so internal paths read
/// `{bucket}/...`.
fn write_container(source: &Path, bucket: &str, zip_path: &Path) -> CoreResult<usize> {
    let file = File::create(zip_path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = 0;
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| CoreError::internal(format!("bucket walk failed: {e}")))?;
        // Regular files only; walkdir does not follow symlinks.
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| CoreError::internal(format!("path outside bucket: {e}")))?;
        let name = format!("{}/{}", bucket, relative.display());

        writer
            .start_file(name, options)
            .map_err(|e| CoreError::internal(format!("failed to start archive entry: {e}")))?;
        let mut src = File::open(entry.path())?;
        io::copy(&mut src, &mut writer)?;
        files += 1;
    }

    writer
        .finish()
        .map_err(|e| CoreError::internal(format!("failed to finalize archive: {e}")))?;
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Read;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn make_bucket(root: &Path, name: &str) -> PathBuf {
        let bucket = root.join(name);
        fs::create_dir_all(bucket.join("nested")).unwrap();
        fs::write(bucket.join("app.log"), b"line one\nline two\n").unwrap();
        fs::write(bucket.join("nested/detail.json"), b"{\"ok\":true}").unwrap();
        bucket
    }

    #[test]
    fn test_archive_name_and_contents() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = make_bucket(dir.path(), "2024-01-01");
        let archive_dir = dir.path().join("archive");

        let entry = archive_bucket(&bucket, &archive_dir, now()).unwrap();

        assert_eq!(entry.bucket, "2024-01-01");
        assert_eq!(entry.files, 2);
        assert_eq!(
            entry.path.file_name().unwrap(),
            "2024-01-01_20240110_000000.zip"
        );
        // Source is gone only after a successful archive.
        assert!(!bucket.exists());

        let mut zip = zip::ZipArchive::new(File::open(&entry.path).unwrap()).unwrap();
        let mut names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["2024-01-01/app.log", "2024-01-01/nested/detail.json"]
        );

        let mut content = String::new();
        zip.by_name("2024-01-01/app.log")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "line one\nline two\n");
    }

    #[test]
    fn test_empty_bucket_archives_as_empty_container() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = dir.path().join("2024-01-02");
        fs::create_dir_all(&bucket).unwrap();
        let archive_dir = dir.path().join("archive");

        let entry = archive_bucket(&bucket, &archive_dir, now()).unwrap();
        assert_eq!(entry.files, 0);
        assert!(!bucket.exists());

        let zip = zip::ZipArchive::new(File::open(&entry.path).unwrap()).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn test_failed_archive_leaves_source_intact() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = make_bucket(dir.path(), "2024-01-03");
        let archive_dir = dir.path().join("archive");

        // Occupy the target path with a directory so the container cannot
        // be created.
        fs::create_dir_all(archive_dir.join("2024-01-03_20240110_000000.zip")).unwrap();

        let err = archive_bucket(&bucket, &archive_dir, now()).unwrap_err();
        assert!(matches!(err, CoreError::ArchiveWrite { .. }));

        // Source bucket untouched, byte for byte.
        assert!(bucket.is_dir());
        assert_eq!(
            fs::read(bucket.join("app.log")).unwrap(),
            b"line one\nline two\n"
        );
        assert_eq!(
            fs::read(bucket.join("nested/detail.json")).unwrap(),
            b"{\"ok\":true}"
        );
    }

    #[test]
    fn test_symlinks_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = make_bucket(dir.path(), "2024-01-04");
        let outside = dir.path().join("outside.txt");
        fs::write(&outside, b"not bucket data").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(&outside, bucket.join("link.txt")).unwrap();

        let entry = archive_bucket(&bucket, &dir.path().join("archive"), now()).unwrap();
        assert_eq!(entry.files, 2);
    }
}
