//! Modification-time snapshots of the stub output directory.
//!
//! A [`MtimeSnapshot`] records the modification time of every file under a
//! root that matches a glob. Comparing a snapshot taken before the generator
//! runs with one taken afterwards yields the [`ChangedFileSet`]: files that
//! are new, or whose modification time increased.

use globset::{GlobBuilder, GlobMatcher};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::StubfixError;

/// Compile a glob over `/`-separated relative paths.
///
/// `*` does not cross directory boundaries; `**` does.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher, StubfixError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| StubfixError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })
}

/// Modification times of the files under a root matching a glob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MtimeSnapshot {
    /// Relative path (forward slashes) to modification time.
    mtimes: BTreeMap<String, SystemTime>,
}

impl MtimeSnapshot {
    /// Scan `root` for files whose relative path matches `glob`.
    ///
    /// A missing root yields an empty snapshot.
    pub fn capture(root: &Path, glob: &GlobMatcher) -> Result<Self, StubfixError> {
        let mut mtimes = BTreeMap::new();
        if !root.exists() {
            debug!(root = %root.display(), "snapshot root does not exist");
            return Ok(MtimeSnapshot { mtimes });
        }

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                StubfixError::io(path, io::Error::other(e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| StubfixError::internal(e.to_string()))?;
            // Convert to forward slashes for consistency
            let relative_str = relative
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            if !glob.is_match(&relative_str) {
                continue;
            }

            let modified = fs::metadata(entry.path())
                .and_then(|metadata| metadata.modified())
                .map_err(|e| StubfixError::io(entry.path(), e))?;
            mtimes.insert(relative_str, modified);
        }

        debug!(root = %root.display(), files = mtimes.len(), "captured snapshot");
        Ok(MtimeSnapshot { mtimes })
    }

    /// Number of files in the snapshot.
    pub fn len(&self) -> usize {
        self.mtimes.len()
    }

    /// Check if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.mtimes.is_empty()
    }

    /// Relative paths in the snapshot, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.mtimes.keys().map(String::as_str)
    }

    /// Files present in `after` that are missing here or have a newer mtime.
    pub fn changed_since(&self, after: &MtimeSnapshot) -> ChangedFileSet {
        let files = after
            .mtimes
            .iter()
            .filter(|(path, modified)| match self.mtimes.get(*path) {
                Some(before) => *modified > before,
                None => true,
            })
            .map(|(path, _)| path.clone())
            .collect();
        ChangedFileSet { files }
    }

    /// Every file in the snapshot, as a changed set.
    pub fn into_changed(self) -> ChangedFileSet {
        ChangedFileSet {
            files: self.mtimes.into_keys().collect(),
        }
    }
}

/// Sorted relative paths of files changed across a generator run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedFileSet {
    files: Vec<String>,
}

impl ChangedFileSet {
    /// Relative paths, sorted.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Absolute paths under `root`, in the same order.
    pub fn paths_under(&self, root: &Path) -> Vec<PathBuf> {
        self.files.iter().map(|file| root.join(file)).collect()
    }

    /// Number of changed files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
