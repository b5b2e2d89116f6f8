//! Process environment
//!
//! The `cache` and `output` directories are created once, idempotently,
//! before any mode logic runs. The resulting `Environment` is passed into
//! the dispatcher and the filesystem collaborators instead of being
//! ambient global state.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{io_error, DtError, DtErrorKind, Result};

/// Directory for derived datasets and the ATT&CK knowledge base
pub const CACHE_DIR: &str = "cache";
/// Directory every generator writes into
pub const OUTPUT_DIR: &str = "output";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    root: PathBuf,
    cache_dir: PathBuf,
    output_dir: PathBuf,
}

impl Environment {
    /// Create `cache` and `output` under `root` if missing
    ///
    /// Existing directories (and their content) are left untouched, so
    /// calling this twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `Io` if a directory cannot be created, or `InvalidInput` if
    /// the path exists but is not a directory.
    pub fn bootstrap(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let env = Self {
            cache_dir: root.join(CACHE_DIR),
            output_dir: root.join(OUTPUT_DIR),
            root,
        };

        for dir in [&env.cache_dir, &env.output_dir] {
            if dir.exists() && !dir.is_dir() {
                return Err(DtError::new(DtErrorKind::InvalidInput)
                    .with_op("bootstrap")
                    .with_path(dir)
                    .with_message("exists but is not a directory"));
            }
            fs::create_dir_all(dir).map_err(|e| io_error("bootstrap", dir, e))?;
        }

        tracing::debug!(
            cache_dir = %env.cache_dir.display(),
            output_dir = %env.output_dir.display(),
            "environment ready"
        );
        Ok(env)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Both directories still exist
    pub fn is_ready(&self) -> bool {
        self.cache_dir.is_dir() && self.output_dir.is_dir()
    }

    /// Path of a file in the output directory
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// Path of a file in the cache directory
    pub fn cache_path(&self, file_name: &str) -> PathBuf {
        self.cache_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bootstrap_creates_directories() {
        let temp = TempDir::new().unwrap();
        let env = Environment::bootstrap(temp.path()).unwrap();

        assert!(env.cache_dir().is_dir());
        assert!(env.output_dir().is_dir());
        assert!(env.is_ready());
        assert_eq!(env.output_path("a.json"), temp.path().join("output/a.json"));
    }

    #[test]
    fn test_bootstrap_is_idempotent_and_keeps_content() {
        let temp = TempDir::new().unwrap();
        let env = Environment::bootstrap(temp.path()).unwrap();
        fs::write(env.output_path("keep.txt"), b"keep").unwrap();

        let again = Environment::bootstrap(temp.path()).unwrap();

        assert_eq!(env, again);
        assert_eq!(fs::read(again.output_path("keep.txt")).unwrap(), b"keep");
    }

    #[test]
    fn test_bootstrap_rejects_file_in_place_of_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(OUTPUT_DIR), b"not a dir").unwrap();

        let err = Environment::bootstrap(temp.path()).unwrap_err();
        assert_eq!(err.kind(), DtErrorKind::InvalidInput);
    }

    #[test]
    fn test_not_ready_after_removal() {
        let temp = TempDir::new().unwrap();
        let env = Environment::bootstrap(temp.path()).unwrap();
        fs::remove_dir(env.output_dir()).unwrap();

        assert!(!env.is_ready());
    }
}
