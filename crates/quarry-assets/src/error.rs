//! Error types for the resource system.

use std::fmt;
use std::path::PathBuf;

use crate::types::ResourceType;

/// Errors that can occur during resource operations.
///
/// These stay inside the crate boundary and inside backends. The manager and
/// loader APIs convert them into `None`/`false` plus a log line.
#[derive(Debug)]
pub enum AssetError {
    /// The source file does not exist.
    NotFound {
        /// The path that was requested.
        path: String,
    },

    /// Failed to read resource data from the source.
    IoError {
        /// The path that failed to load.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// The source file exists but holds no data.
    EmptyFile {
        /// The offending path.
        path: String,
    },

    /// The file extension is not handled by any backend for the requested type.
    UnsupportedFormat {
        /// The path being validated.
        path: String,
        /// The extension that was rejected (empty if the path has none).
        extension: String,
    },

    /// No registered backend claims the resource type or format.
    NoBackend {
        /// The requested resource type.
        resource_type: ResourceType,
        /// The path that could not be served.
        path: String,
    },

    /// The backend failed to decode the resource.
    LoaderError {
        /// The path being loaded.
        path: String,
        /// Description of the error.
        message: String,
    },

    /// The backend panicked while producing the resource.
    BackendPanicked {
        /// Name of the backend.
        backend: String,
        /// The path being loaded, or the operation when not path-specific.
        context: String,
    },

    /// The operation is not valid in the resource's current state.
    InvalidState {
        /// Description of why the state is invalid.
        reason: String,
    },

    /// Generic error with a message.
    Other {
        /// Error message.
        message: String,
    },
}

impl AssetError {
    /// Convenience constructor for decode failures.
    pub fn loader(path: impl Into<String>, message: impl Into<String>) -> Self {
        AssetError::LoaderError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for errors raised before any backend work started.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AssetError::NotFound { .. }
                | AssetError::EmptyFile { .. }
                | AssetError::UnsupportedFormat { .. }
        )
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound { path } => {
                write!(f, "Resource not found: {}", path)
            }
            AssetError::IoError { path, source } => {
                write!(f, "IO error loading '{}': {}", path.display(), source)
            }
            AssetError::EmptyFile { path } => {
                write!(f, "Resource file is empty: {}", path)
            }
            AssetError::UnsupportedFormat { path, extension } => {
                if extension.is_empty() {
                    write!(f, "Unsupported format for '{}': missing extension", path)
                } else {
                    write!(f, "Unsupported format for '{}': .{}", path, extension)
                }
            }
            AssetError::NoBackend {
                resource_type,
                path,
            } => {
                write!(
                    f,
                    "No backend registered for {} resource '{}'",
                    resource_type, path
                )
            }
            AssetError::LoaderError { path, message } => {
                write!(f, "Failed to load '{}': {}", path, message)
            }
            AssetError::BackendPanicked { backend, context } => {
                write!(f, "Backend '{}' panicked during {}", backend, context)
            }
            AssetError::InvalidState { reason } => {
                write!(f, "Invalid resource state: {}", reason)
            }
            AssetError::Other { message } => {
                write!(f, "Resource error: {}", message)
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AssetError {
    fn from(err: std::io::Error) -> Self {
        AssetError::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}

/// Result type alias for resource operations.
pub type AssetResult<T> = Result<T, AssetError>;
