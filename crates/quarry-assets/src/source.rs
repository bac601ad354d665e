//! Resource sources - where resources come from.

use std::path::{Path, PathBuf};

use crate::error::{AssetError, AssetResult};
use crate::io::FileReader;

/// Scheme prefix for runtime-generated content (textures, shaders).
pub const GENERATED_SCHEME: &str = "generated://";

/// Scheme prefix for procedural primitives (models).
pub const PRIMITIVE_SCHEME: &str = "primitive://";

/// The source of a resource, parsed from its path string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceSource {
    /// A file on disk, relative to the manager's base path or absolute.
    File {
        /// The path as provided.
        path: PathBuf,
    },

    /// Runtime-constructed content, `generated://<name>`.
    Generated {
        /// The name after the scheme.
        name: String,
    },

    /// A procedural primitive, `primitive://<name>`.
    Primitive {
        /// The name after the scheme.
        name: String,
    },
}

impl ResourceSource {
    /// Parse a resource path string.
    pub fn parse(path: &str) -> Self {
        if let Some(name) = path.strip_prefix(GENERATED_SCHEME) {
            ResourceSource::Generated {
                name: name.to_string(),
            }
        } else if let Some(name) = path.strip_prefix(PRIMITIVE_SCHEME) {
            ResourceSource::Primitive {
                name: name.to_string(),
            }
        } else {
            ResourceSource::File {
                path: PathBuf::from(path),
            }
        }
    }

    /// Returns `true` for `generated://` and `primitive://` sources.
    pub fn is_virtual(&self) -> bool {
        !matches!(self, ResourceSource::File { .. })
    }

    /// The file path, if this is a file source.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            ResourceSource::File { path } => Some(path),
            _ => None,
        }
    }

    /// Lowercased extension of a file source (without the dot).
    pub fn extension(&self) -> Option<String> {
        match self {
            ResourceSource::File { path } => path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase()),
            _ => None,
        }
    }

    /// Logical name: the file stem, or the name after the scheme.
    pub fn logical_name(&self) -> String {
        match self {
            ResourceSource::File { path } => path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string(),
            ResourceSource::Generated { name } | ResourceSource::Primitive { name } => {
                name.clone()
            }
        }
    }

    /// Get a string representation of this source for logging/debugging.
    pub fn display_path(&self) -> String {
        match self {
            ResourceSource::File { path } => path.display().to_string(),
            ResourceSource::Generated { name } => format!("{}{}", GENERATED_SCHEME, name),
            ResourceSource::Primitive { name } => format!("{}{}", PRIMITIVE_SCHEME, name),
        }
    }

    /// Validate that the source can be handed to a backend.
    ///
    /// Virtual sources always validate. File sources must exist, be non-empty
    /// and carry an extension accepted by `supports_extension`.
    pub fn validate(
        &self,
        reader: &FileReader,
        supports_extension: impl Fn(&str) -> bool,
    ) -> AssetResult<()> {
        let ResourceSource::File { path } = self else {
            return Ok(());
        };

        let display = path.display().to_string();
        match reader.file_len(path) {
            None => return Err(AssetError::NotFound { path: display }),
            Some(0) => return Err(AssetError::EmptyFile { path: display }),
            Some(_) => {}
        }

        let extension = self.extension().unwrap_or_default();
        if extension.is_empty() || !supports_extension(&extension) {
            return Err(AssetError::UnsupportedFormat {
                path: display,
                extension,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schemes() {
        assert_eq!(
            ResourceSource::parse("generated://white"),
            ResourceSource::Generated {
                name: "white".to_string()
            }
        );
        assert_eq!(
            ResourceSource::parse("primitive://cube"),
            ResourceSource::Primitive {
                name: "cube".to_string()
            }
        );
        assert!(!ResourceSource::parse("textures/a.png").is_virtual());
    }

    #[test]
    fn test_logical_name_and_extension() {
        let source = ResourceSource::parse("textures/Player.PNG");
        assert_eq!(source.logical_name(), "Player");
        assert_eq!(source.extension().as_deref(), Some("png"));

        let source = ResourceSource::parse("primitive://cube");
        assert_eq!(source.logical_name(), "cube");
        assert_eq!(source.extension(), None);
        assert_eq!(source.display_path(), "primitive://cube");
    }

    #[test]
    fn test_validation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("full.png"), b"data").unwrap();
        std::fs::write(dir.path().join("empty.png"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"data").unwrap();
        let reader = FileReader::new(dir.path());
        let png_only = |ext: &str| ext == "png";

        assert!(ResourceSource::parse("full.png").validate(&reader, png_only).is_ok());
        assert!(matches!(
            ResourceSource::parse("missing.png").validate(&reader, png_only),
            Err(AssetError::NotFound { .. })
        ));
        assert!(matches!(
            ResourceSource::parse("empty.png").validate(&reader, png_only),
            Err(AssetError::EmptyFile { .. })
        ));
        assert!(matches!(
            ResourceSource::parse("notes.txt").validate(&reader, png_only),
            Err(AssetError::UnsupportedFormat { .. })
        ));
        assert!(ResourceSource::parse("generated://anything")
            .validate(&reader, png_only)
            .is_ok());
    }
}
