//! Temporary fixture directories.

use fs_err as fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory for fixture files.
///
/// The directory is automatically removed when dropped.
pub struct FixtureDir {
    /// Temporary directory holding the fixtures.
    _temp: TempDir,
    /// Path to the directory root.
    root: PathBuf,
}

impl FixtureDir {
    /// Create a new, empty fixture directory.
    pub fn new() -> io::Result<Self> {
        let temp = TempDir::new()?;
        let root = temp.path().to_path_buf();
        Ok(Self { _temp: temp, root })
    }

    /// Get the directory root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute path for a relative path.
    pub fn path(&self, rel_path: &str) -> PathBuf {
        self.root.join(rel_path)
    }

    /// Path spec for a relative file, directory or glob, as accepted by the
    /// fixture loader.
    pub fn spec(&self, rel_path: &str) -> String {
        self.path(rel_path).to_string_lossy().into_owned()
    }

    /// Write a fixture file, creating parent directories.
    pub fn write(&self, rel_path: &str, contents: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        let path = self.root.join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// List all files, relative to the root, sorted.
    pub fn list_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        self.list_files_recursive(&self.root, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn list_files_recursive(&self, dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                self.list_files_recursive(&path, files)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                files.push(rel.to_path_buf());
            }
        }
        Ok(())
    }
}
