//! # Artifact Store
//!
//! Persists rendered tables as UTF-8 (with BOM) `.csv` files in the
//! application's private documents directory, and offers the snapshot
//! listing, inspection and deletion the file browser relies on.
//!
//! ## Naming
//!
//! ```text
//! <prefix><YYYYMMDD_HHMMSS>.csv        first file in a given second
//! <prefix><YYYYMMDD_HHMMSS>_<n>.csv    n >= 2, when that name is taken
//! ```
//!
//! ## Atomicity
//!
//! Content is written to a hidden temporary file in the same directory,
//! synced, then linked into place with a no-clobber rename. Readers never
//! see a partial file, an existing artifact is never overwritten, and the
//! temporary file is removed if anything fails.

use chrono::{DateTime, Local};
use log::{info, warn};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::flatten::Table;
use crate::common::error::PersistenceError;

/// UTF-8 byte-order marker written ahead of every table.
pub const BOM: &str = "\u{FEFF}";

/// Extension of persisted tables.
pub const EXTENSION: &str = "csv";

/// Attempts at finding a free name within one timestamp.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// A table file on disk. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedArtifact {
    pub path: PathBuf,
    pub size: u64,
    pub created: DateTime<Local>,
}

impl PersistedArtifact {
    fn from_path(path: PathBuf) -> std::io::Result<Self> {
        let metadata = fs::metadata(&path)?;
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or_else(|_| SystemTime::now());
        Ok(Self {
            path,
            size: metadata.len(),
            created: DateTime::<Local>::from(created),
        })
    }

    /// Describes a file this process has just written, without touching disk.
    fn written(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            created: Local::now(),
        }
    }

    /// File name without directory.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The documents directory holding generated tables.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    directory: PathBuf,
    file_prefix: String,
}

impl ArtifactStore {
    pub fn new(directory: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes `table` to a new, uniquely named file.
    ///
    /// # Errors
    /// [`PersistenceError::Io`] if the directory cannot be created or the
    /// file cannot be written. No partial file is left behind.
    pub fn persist(&self, table: &Table) -> Result<PersistedArtifact, PersistenceError> {
        fs::create_dir_all(&self.directory)
            .map_err(|e| PersistenceError::io(&self.directory, e))?;

        let mut content = String::with_capacity(BOM.len() + 64);
        content.push_str(BOM);
        content.push_str(&table.render());

        let mut temp = tempfile::Builder::new()
            .prefix(".scansheet-")
            .suffix(".tmp")
            .tempfile_in(&self.directory)
            .map_err(|e| PersistenceError::io(&self.directory, e))?;
        temp.write_all(content.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| PersistenceError::io(temp.path(), e))?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let path = self.directory.join(self.file_name(&stamp, attempt));
            match temp.persist_noclobber(&path) {
                Ok(_) => {
                    // Linked: the file is complete, so no later lookup may fail the write.
                    let artifact = PersistedArtifact::written(path, content.len() as u64);
                    info!(
                        "💾 Saved table {} ({})",
                        artifact.path.display(),
                        format_file_size(artifact.size)
                    );
                    return Ok(artifact);
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    temp = e.file;
                }
                Err(e) => return Err(PersistenceError::io(path, e.error)),
            }
        }

        Err(PersistenceError::io(
            &self.directory,
            std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!("no free file name for timestamp {}", stamp),
            ),
        ))
    }

    fn file_name(&self, stamp: &str, attempt: u32) -> String {
        if attempt == 1 {
            format!("{}{}.{}", self.file_prefix, stamp, EXTENSION)
        } else {
            format!("{}{}_{}.{}", self.file_prefix, stamp, attempt, EXTENSION)
        }
    }

    /// Snapshot of the stored tables, newest first.
    ///
    /// Files that disappear while listing are skipped; files that appear
    /// afterwards are not included. A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<PersistedArtifact>, PersistenceError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::io(&self.directory, e)),
        };

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("⚠️  Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !has_table_extension(&path) {
                continue;
            }
            match PersistedArtifact::from_path(path) {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => warn!("⚠️  Skipping {}: {}", entry.path().display(), e),
            }
        }

        artifacts.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.path.cmp(&a.path)));
        info!("Found {} saved tables", artifacts.len());
        Ok(artifacts)
    }

    /// Size and creation time of one stored table.
    pub fn info(&self, path: &Path) -> Result<PersistedArtifact, PersistenceError> {
        let path = self.contained(path)?;
        PersistedArtifact::from_path(path.clone()).map_err(|e| PersistenceError::io(path, e))
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.contained(path).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Deletes one stored table. Paths outside the store are refused.
    pub fn delete(&self, path: &Path) -> Result<(), PersistenceError> {
        let path = self.contained(path)?;
        fs::remove_file(&path).map_err(|e| PersistenceError::io(&path, e))?;
        info!("🗑️  Deleted {}", path.display());
        Ok(())
    }

    /// Resolves a bare file name or a path into a `.csv` path directly
    /// inside the store directory.
    fn contained(&self, path: &Path) -> Result<PathBuf, PersistenceError> {
        let candidate = if path.is_absolute() || path.parent().is_some_and(|p| !p.as_os_str().is_empty()) {
            path.to_path_buf()
        } else {
            self.directory.join(path)
        };

        let outside = || PersistenceError::OutsideStore(path.to_path_buf());
        if !has_table_extension(&candidate) {
            return Err(outside());
        }
        let parent = candidate.parent().ok_or_else(outside)?;
        let parent = fs::canonicalize(parent).map_err(|e| PersistenceError::io(parent, e))?;
        let directory = fs::canonicalize(&self.directory)
            .map_err(|e| PersistenceError::io(&self.directory, e))?;
        if parent != directory {
            return Err(outside());
        }
        let name = candidate.file_name().ok_or_else(outside)?;
        Ok(directory.join(name))
    }
}

fn has_table_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(EXTENSION))
        .unwrap_or(false)
}

/// Human-readable file size using 1000-based KB/MB units.
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1000.0;
    const MB: f64 = 1000.0 * 1000.0;
    let size = bytes as f64;
    if bytes < 1000 {
        format!("{} bytes", bytes)
    } else if size < MB {
        format!("{:.1} KB", size / KB)
    } else {
        format!("{:.1} MB", size / MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::flatten::flatten;
    use serde_json::json;
    use tempfile::TempDir;

    fn table() -> Table {
        let record = json!({"name": "Jane", "note": "a, b"});
        flatten(&vec![record.as_object().cloned().unwrap()])
    }

    #[test]
    fn test_persist_writes_bom_and_rendered_table() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), "ficha_cadastro_");

        let artifact = store.persist(&table()).unwrap();
        let bytes = fs::read(&artifact.path).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        assert_eq!(
            String::from_utf8(bytes[3..].to_vec()).unwrap(),
            "name,note\nJane,\"a, b\""
        );
        assert_eq!(artifact.size, bytes.len() as u64);

        let name = artifact.name();
        assert!(name.starts_with("ficha_cadastro_"));
        assert!(name.ends_with(".csv"));
        // prefix + YYYYMMDD_HHMMSS + .csv
        assert_eq!(name.len(), "ficha_cadastro_".len() + 15 + 4);
    }

    #[test]
    fn test_persisted_artifact_reports_written_length_and_time() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), "ficha_cadastro_");

        let before = Local::now();
        let artifact = store.persist(&table()).unwrap();
        let after = Local::now();

        let expected = (BOM.len() + table().render().len()) as u64;
        assert_eq!(artifact.size, expected);
        assert_eq!(fs::metadata(&artifact.path).unwrap().len(), expected);
        assert!(artifact.created >= before && artifact.created <= after);
    }

    #[test]
    fn test_written_artifact_needs_no_lookup() {
        let path = PathBuf::from("/nonexistent/ficha_cadastro_20250803_101500.csv");
        let artifact = PersistedArtifact::written(path.clone(), 42);
        assert_eq!(artifact.path, path);
        assert_eq!(artifact.size, 42);
        assert_eq!(artifact.name(), "ficha_cadastro_20250803_101500.csv");
    }

    #[test]
    fn test_persist_twice_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), "ficha_cadastro_");

        let first = store.persist(&table()).unwrap();
        let second = store.persist(&table()).unwrap();
        assert_ne!(first.path, second.path);
        assert_eq!(fs::read(&first.path).unwrap(), fs::read(&second.path).unwrap());

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_persist_failure_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("documents");
        fs::write(&blocker, b"not a directory").unwrap();

        let store = ArtifactStore::new(&blocker, "ficha_cadastro_");
        assert!(matches!(store.persist(&table()), Err(PersistenceError::Io { .. })));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_list_only_tables_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), "ficha_cadastro_");
        assert!(store.list().unwrap().is_empty());

        let first = store.persist(&table()).unwrap();
        let second = store.persist(&table()).unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created >= listed[1].created);
        let paths: Vec<_> = listed.iter().map(|a| a.path.clone()).collect();
        assert!(paths.contains(&first.path));
        assert!(paths.contains(&second.path));
    }

    #[test]
    fn test_list_of_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("never-created"), "x_");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_delete_and_info() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), "ficha_cadastro_");
        let artifact = store.persist(&table()).unwrap();

        let info = store.info(Path::new(&artifact.name())).unwrap();
        assert_eq!(info.size, artifact.size);
        assert!(store.exists(&artifact.path));

        store.delete(&artifact.path).unwrap();
        assert!(!store.exists(&artifact.path));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_delete_refuses_paths_outside_store() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let stray = other.path().join("stray.csv");
        fs::write(&stray, b"keep me").unwrap();

        let store = ArtifactStore::new(dir.path(), "ficha_cadastro_");
        assert!(matches!(store.delete(&stray), Err(PersistenceError::OutsideStore(_))));
        assert!(matches!(
            store.delete(Path::new("config.toml")),
            Err(PersistenceError::OutsideStore(_))
        ));
        assert!(stray.exists());
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 bytes");
        assert_eq!(format_file_size(1_500), "1.5 KB");
        assert_eq!(format_file_size(2_300_000), "2.3 MB");
    }
}
