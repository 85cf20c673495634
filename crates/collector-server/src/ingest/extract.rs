//! Safe ZIP extraction
//!
//! Archives come from an external publisher and are treated as untrusted:
//! every entry name is lexically resolved against the extraction root and
//! anything that escapes it fails the archive (Zip Slip defense).
//! Extraction is blocking I/O and runs on the blocking thread pool.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::error::{CollectorError, Result};

/// Per-archive temporary extraction directory, removed on drop.
///
/// Dropping the guard deletes the directory recursively on every exit path,
/// including task cancellation, so a failed or cancelled pipeline never
/// leaks extraction scratch space.
#[derive(Debug)]
pub struct ExtractDirGuard {
    path: PathBuf,
}

impl ExtractDirGuard {
    /// Create a uniquely named extraction directory under `root`, derived
    /// from the archive filename and the current timestamp to avoid
    /// collisions between runs.
    pub fn create(root: &Path, archive_file_name: &str) -> io::Result<Self> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = root.join(format!("extract_{archive_file_name}_{millis}"));
        fs::create_dir_all(&path)?;
        debug!(dir = %path.display(), "Created extraction directory");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExtractDirGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                warn!(dir = %self.path.display(), error = %e, "Failed to remove extraction directory");
            } else {
                debug!(dir = %self.path.display(), "Removed extraction directory");
            }
        }
    }
}

/// Extract a ZIP archive into `target_dir`.
///
/// Returns the written file paths in archive order; directory entries
/// create directories and are excluded from the result. Any entry resolving
/// outside `target_dir` aborts with [`CollectorError::ZipTraversal`].
pub async fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<Vec<PathBuf>> {
    let zip_path = zip_path.to_path_buf();
    let target_dir = target_dir.to_path_buf();

    tokio::task::spawn_blocking(move || extract_zip_blocking(&zip_path, &target_dir))
        .await
        .map_err(|e| CollectorError::Extraction(format!("extraction task failed: {e}")))?
}

fn extract_zip_blocking(zip_path: &Path, target_dir: &Path) -> Result<Vec<PathBuf>> {
    info!(archive = %zip_path.display(), dir = %target_dir.display(), "Extracting archive");

    let file = fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| CollectorError::Extraction(format!("{}: {e}", zip_path.display())))?;

    // The extraction root exists at this point; canonicalize once so entry
    // containment checks are against an absolute, symlink-free base.
    let root = target_dir.canonicalize()?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| CollectorError::Extraction(format!("entry {index}: {e}")))?;
        let entry_name = entry.name().to_string();
        let destination = resolve_entry_path(&root, &entry_name)?;

        if entry.is_dir() {
            fs::create_dir_all(&destination)?;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = fs::File::create(&destination)?;
        io::copy(&mut entry, &mut output)?;
        debug!(file = %destination.display(), "Extracted entry");
        extracted.push(destination);
    }

    info!(archive = %zip_path.display(), files = extracted.len(), "Archive extracted");
    Ok(extracted)
}

/// Lexically resolve an entry name under `root`, rejecting absolute names
/// and any `..` traversal that would leave the root.
fn resolve_entry_path(root: &Path, entry_name: &str) -> Result<PathBuf> {
    let mut resolved = root.to_path_buf();

    for component in Path::new(entry_name).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
                if !resolved.starts_with(root) {
                    return Err(CollectorError::ZipTraversal {
                        entry: entry_name.to_string(),
                    });
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(CollectorError::ZipTraversal {
                    entry: entry_name.to_string(),
                });
            }
        }
    }

    if !resolved.starts_with(root) {
        return Err(CollectorError::ZipTraversal {
            entry: entry_name.to_string(),
        });
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn write_test_zip(path: &Path, entries: &[(&str, Option<&[u8]>)]) {
        let file = fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options: FileOptions =
            FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, contents) in entries {
            match contents {
                Some(bytes) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(bytes).unwrap();
                }
                None => {
                    writer.add_directory(*name, options).unwrap();
                }
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_resolve_entry_path_accepts_plain_names() {
        let root = Path::new("/data/extract");
        assert_eq!(
            resolve_entry_path(root, "a.csv").unwrap(),
            root.join("a.csv")
        );
        assert_eq!(
            resolve_entry_path(root, "nested/dir/a.csv").unwrap(),
            root.join("nested/dir/a.csv")
        );
    }

    #[test]
    fn test_resolve_entry_path_allows_internal_dotdot() {
        let root = Path::new("/data/extract");
        assert_eq!(
            resolve_entry_path(root, "a/../b.csv").unwrap(),
            root.join("b.csv")
        );
    }

    #[test]
    fn test_resolve_entry_path_rejects_escape() {
        let root = Path::new("/data/extract");
        assert!(matches!(
            resolve_entry_path(root, "../evil.txt"),
            Err(CollectorError::ZipTraversal { .. })
        ));
        assert!(matches!(
            resolve_entry_path(root, "a/../../evil.txt"),
            Err(CollectorError::ZipTraversal { .. })
        ));
        assert!(matches!(
            resolve_entry_path(root, "../../etc/passwd"),
            Err(CollectorError::ZipTraversal { .. })
        ));
    }

    #[test]
    fn test_resolve_entry_path_rejects_absolute_names() {
        let root = Path::new("/data/extract");
        assert!(matches!(
            resolve_entry_path(root, "/etc/passwd"),
            Err(CollectorError::ZipTraversal { .. })
        ));
    }

    #[tokio::test]
    async fn test_extracts_files_in_order() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("a.zip");
        write_test_zip(
            &zip_path,
            &[
                ("first.csv", Some(b"1,2,3\n".as_slice())),
                ("second.csv", Some(b"4,5,6\n".as_slice())),
            ],
        );

        let out = TempDir::new().unwrap();
        let files = extract_zip(&zip_path, out.path()).await.unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("first.csv"));
        assert!(files[1].ends_with("second.csv"));
        assert_eq!(fs::read(&files[0]).unwrap(), b"1,2,3\n");
    }

    #[tokio::test]
    async fn test_nested_entries_create_parents() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("nested.zip");
        write_test_zip(&zip_path, &[("sub/dir/data.csv", Some(b"x".as_slice()))]);

        let out = TempDir::new().unwrap();
        let files = extract_zip(&zip_path, out.path()).await.unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].exists());
    }

    #[tokio::test]
    async fn test_directory_entries_are_not_returned() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("dirs.zip");
        write_test_zip(
            &zip_path,
            &[("foo/", None), ("foo/data.csv", Some(b"x".as_slice()))],
        );

        let out = TempDir::new().unwrap();
        let files = extract_zip(&zip_path, out.path()).await.unwrap();

        assert_eq!(files.len(), 1);
        assert!(out.path().join("foo").is_dir());
    }

    #[tokio::test]
    async fn test_empty_archive_yields_empty_list() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("empty.zip");
        write_test_zip(&zip_path, &[]);

        let out = TempDir::new().unwrap();
        let files = extract_zip(&zip_path, out.path()).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_traversal_entry_fails_archive() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("slip.zip");
        write_test_zip(&zip_path, &[("../evil.txt", Some(b"pwn".as_slice()))]);

        let out = TempDir::new().unwrap();
        let result = extract_zip(&zip_path, out.path()).await;

        assert!(matches!(result, Err(CollectorError::ZipTraversal { .. })));
        // Nothing may land outside the extraction root.
        assert!(!tmp.path().join("evil.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_archive_is_io_error() {
        let out = TempDir::new().unwrap();
        let result = extract_zip(Path::new("/nonexistent.zip"), out.path()).await;
        assert!(matches!(result, Err(CollectorError::Io(_))));
    }

    #[test]
    fn test_guard_removes_directory_on_drop() {
        let tmp = TempDir::new().unwrap();
        let guard = ExtractDirGuard::create(tmp.path(), "a.zip").unwrap();
        let dir = guard.path().to_path_buf();
        assert!(dir.is_dir());

        fs::write(dir.join("leftover.csv"), b"x").unwrap();
        drop(guard);
        assert!(!dir.exists());
    }

    #[test]
    fn test_guard_names_embed_archive_name() {
        let tmp = TempDir::new().unwrap();
        let guard = ExtractDirGuard::create(tmp.path(), "a.zip").unwrap();
        let name = guard.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("extract_a.zip_"));
    }
}
