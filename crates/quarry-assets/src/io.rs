//! Filesystem access for resource loading.

use std::path::{Path, PathBuf};

use crate::error::{AssetError, AssetResult};

/// Synchronous file reader rooted at a base directory.
///
/// Relative resource paths are resolved against the base path; absolute
/// paths are used as-is.
#[derive(Debug, Clone)]
pub struct FileReader {
    base_path: PathBuf,
}

impl Default for FileReader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FileReader {
    /// Create a new file reader with a base path.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// The directory relative paths are resolved against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a path relative to the base path.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Read bytes synchronously.
    pub fn read_bytes_sync(&self, path: &Path) -> AssetResult<Vec<u8>> {
        let full_path = self.resolve_path(path);
        std::fs::read(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound {
                    path: full_path.display().to_string(),
                }
            } else {
                AssetError::IoError {
                    path: full_path.clone(),
                    source: e,
                }
            }
        })
    }

    /// Read a UTF-8 text file synchronously.
    pub fn read_string_sync(&self, path: &Path) -> AssetResult<String> {
        let bytes = self.read_bytes_sync(path)?;
        String::from_utf8(bytes).map_err(|e| AssetError::LoaderError {
            path: path.display().to_string(),
            message: format!("Invalid UTF-8: {}", e),
        })
    }

    /// Check if a path exists synchronously.
    pub fn exists_sync(&self, path: &Path) -> bool {
        self.resolve_path(path).is_file()
    }

    /// Size of the file in bytes, if it exists.
    pub fn file_len(&self, path: &Path) -> Option<u64> {
        std::fs::metadata(self.resolve_path(path))
            .ok()
            .map(|meta| meta.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let reader = FileReader::new("/assets");
        assert_eq!(
            reader.resolve_path(Path::new("tex/a.png")),
            PathBuf::from("/assets/tex/a.png")
        );
        assert_eq!(
            reader.resolve_path(Path::new("/tmp/b.png")),
            PathBuf::from("/tmp/b.png")
        );
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let reader = FileReader::new(dir.path());
        let err = reader.read_bytes_sync(Path::new("missing.bin")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound { .. }));
    }

    #[test]
    fn test_file_len() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let reader = FileReader::new(dir.path());
        assert_eq!(reader.file_len(Path::new("a.txt")), Some(5));
        assert!(reader.exists_sync(Path::new("a.txt")));
        assert_eq!(reader.file_len(Path::new("b.txt")), None);
    }
}
