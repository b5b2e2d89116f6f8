//! Atomic write primitives
//!
//! Uses temp→rename pattern to ensure no partial writes

use crate::errors::{io_error, Result};
use std::fs;
use std::path::Path;

/// Atomically write bytes to a file
///
/// Uses temp file + rename: readers see either the old file or the complete
/// new one, never a partial write.
///
/// # Errors
///
/// Returns `Io` if the parent directory, the temp file or the rename fails.
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_error("create_parent_dir", parent, e))?;
        }
    }

    let mut temp_name = target_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = target_path.with_file_name(temp_name);

    fs::write(&temp_path, content).map_err(|e| io_error("write_temp", &temp_path, e))?;
    fs::rename(&temp_path, target_path).map_err(|e| io_error("rename_temp", target_path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("test.yaml");

        atomic_write(&target, b"hello").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"hello");
    }

    #[test]
    fn test_atomic_write_creates_parent() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("subdir").join("test.json");

        atomic_write(&target, b"nested").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"nested");
    }

    #[test]
    fn test_atomic_write_overwrites_wholesale() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("test.csv");

        atomic_write(&target, b"a much longer first version").unwrap();
        atomic_write(&target, b"short").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"short");
    }

    #[test]
    fn test_no_tmp_files_after_write() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("test.txt");

        atomic_write(&target, b"clean").unwrap();

        let tmp_count = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|s| s.ends_with(".tmp"))
                    .unwrap_or(false)
            })
            .count();

        assert_eq!(tmp_count, 0);
    }
}
