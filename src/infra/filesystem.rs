//! Filesystem operations
//!
//! Handles file and directory operations.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Copy a file, replacing the destination
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| FilesystemError::CopyFile {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error: e.to_string(),
        })
}

/// Set the Unix permission bits of a file
pub fn set_mode(path: &Path, mode: u32) -> Result<(), FilesystemError> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        FilesystemError::Permissions {
            path: path.to_path_buf(),
            error: e.to_string(),
        }
    })
}

/// Add the owner-write bit to every entry below `root`
///
/// Returns the number of entries visited.
pub fn make_tree_writable(root: &Path) -> Result<usize, FilesystemError> {
    let mut visited = 0;
    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| FilesystemError::Permissions {
            path: e.path().unwrap_or(root).to_path_buf(),
            error: e.to_string(),
        })?;
        visited += 1;

        if entry.path_is_symlink() {
            continue;
        }
        let metadata = entry.metadata().map_err(|e| FilesystemError::Permissions {
            path: entry.path().to_path_buf(),
            error: e.to_string(),
        })?;
        let mode = metadata.permissions().mode();
        if mode & 0o200 == 0 {
            set_mode(entry.path(), mode | 0o200)?;
        }
    }
    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a/b/c.txt");
        write_file(&path, "hello").unwrap();
        assert_eq!(read_file(&path).unwrap(), "hello");
    }

    #[test]
    fn test_read_missing_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.cfg");
        let err = read_file(&path).unwrap_err();
        assert!(err.to_string().contains("missing.cfg"));
    }

    #[test]
    fn test_make_tree_writable_sets_owner_write() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("isolinux");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("isolinux.cfg");
        fs::write(&file, "menu").unwrap();
        set_mode(&file, 0o444).unwrap();
        set_mode(&dir, 0o555).unwrap();

        let visited = make_tree_writable(temp.path()).unwrap();

        assert_eq!(visited, 3);
        assert_ne!(fs::metadata(&file).unwrap().permissions().mode() & 0o200, 0);
        assert_ne!(fs::metadata(&dir).unwrap().permissions().mode() & 0o200, 0);
    }
}
