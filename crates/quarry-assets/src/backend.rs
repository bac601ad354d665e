//! Backend trait and infrastructure.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::data::ResourceData;
use crate::error::{AssetError, AssetResult};
use crate::io::FileReader;
use crate::resource::{PayloadProvider, Resource};
use crate::source::ResourceSource;
use crate::types::{LoadConfig, ResourceType};

/// Context provided to backends while decoding.
pub struct LoadContext<'a> {
    /// The source of the resource being loaded.
    pub source: &'a ResourceSource,
    /// The declared type of the resource.
    pub resource_type: ResourceType,
    /// The raw file bytes. Empty for virtual sources.
    pub bytes: &'a [u8],
    /// Lowercased file extension (without the dot), if available.
    pub extension: Option<&'a str>,
    /// The settings the load was requested with.
    pub config: &'a LoadConfig,
}

impl LoadContext<'_> {
    /// Path used in error messages.
    pub fn display_path(&self) -> String {
        self.source.display_path()
    }

    /// Shorthand for a decode failure on this resource.
    pub fn error(&self, message: impl Into<String>) -> AssetError {
        AssetError::loader(self.display_path(), message)
    }
}

/// What a backend can load, captured once at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendCapabilities {
    pub resource_types: Vec<ResourceType>,
    /// Lowercased extensions without the dot.
    pub file_formats: Vec<String>,
}

impl BackendCapabilities {
    pub fn new(resource_types: &[ResourceType], file_formats: &[&str]) -> Self {
        Self {
            resource_types: resource_types.to_vec(),
            file_formats: file_formats.iter().map(|f| f.to_ascii_lowercase()).collect(),
        }
    }

    pub fn supports_type(&self, resource_type: ResourceType) -> bool {
        self.resource_types.contains(&resource_type)
    }

    /// Case-insensitive, accepts a leading dot.
    pub fn supports_format(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.');
        self.file_formats.iter().any(|f| f.eq_ignore_ascii_case(ext))
    }
}

/// A pluggable loader for one or more resource families.
///
/// Backends are shared as `Arc<dyn ResourceBackend>` and may be called from
/// several worker threads at once.
///
/// # Example
///
/// ```ignore
/// struct RawBackend {
///     capabilities: BackendCapabilities,
/// }
///
/// impl ResourceBackend for RawBackend {
///     fn name(&self) -> &str {
///         "raw"
///     }
///
///     fn capabilities(&self) -> &BackendCapabilities {
///         &self.capabilities
///     }
///
///     fn decode(&self, ctx: LoadContext<'_>) -> AssetResult<ResourceData> {
///         Ok(ResourceData::Bytes(Arc::from(ctx.bytes)))
///     }
/// }
/// ```
pub trait ResourceBackend: Send + Sync + 'static {
    /// Unique registry name.
    fn name(&self) -> &str;

    fn capabilities(&self) -> &BackendCapabilities;

    /// Called once before first use. Must be idempotent.
    fn initialize(&self) -> AssetResult<()> {
        Ok(())
    }

    fn shutdown(&self) {}

    fn supports_resource_type(&self, resource_type: ResourceType) -> bool {
        self.capabilities().supports_type(resource_type)
    }

    fn supports_file_format(&self, extension: &str) -> bool {
        self.capabilities().supports_format(extension)
    }

    fn supported_resource_types(&self) -> Vec<ResourceType> {
        self.capabilities().resource_types.clone()
    }

    fn supported_file_formats(&self) -> Vec<String> {
        self.capabilities().file_formats.clone()
    }

    /// Check that `source` can be handed to [`decode`](Self::decode).
    fn validate_resource_file(
        &self,
        source: &ResourceSource,
        resource_type: ResourceType,
        reader: &FileReader,
    ) -> AssetResult<()> {
        if !self.supports_resource_type(resource_type) {
            return Err(AssetError::NoBackend {
                resource_type,
                path: source.display_path(),
            });
        }
        source.validate(reader, |ext| self.supports_file_format(ext))
    }

    /// Build the payload from raw bytes (or from the virtual source name).
    fn decode(&self, ctx: LoadContext<'_>) -> AssetResult<ResourceData>;

    /// Human-readable usage summary.
    fn statistics(&self) -> String {
        format!("{}: no statistics", self.name())
    }
}

/// Decode counters shared by the built-in backends.
#[derive(Debug, Default)]
pub struct BackendStats {
    decoded: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
}

impl BackendStats {
    /// Record the outcome of one decode and pass it through.
    pub fn record(&self, result: AssetResult<ResourceData>) -> AssetResult<ResourceData> {
        match &result {
            Ok(data) => {
                self.decoded.fetch_add(1, Ordering::Relaxed);
                self.bytes
                    .fetch_add(data.size_bytes() as u64, Ordering::Relaxed);
            }
            Err(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    pub fn decoded(&self) -> u64 {
        self.decoded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Render as `"<name>: N decoded, N failed, N bytes"`.
    pub fn summary(&self, name: &str) -> String {
        format!(
            "{}: {} decoded, {} failed, {} bytes",
            name,
            self.decoded(),
            self.failed(),
            self.bytes.load(Ordering::Relaxed)
        )
    }
}

/// Run a backend call, turning a panic into [`AssetError::BackendPanicked`].
pub(crate) fn guard_backend<T>(
    backend: &dyn ResourceBackend,
    context: &str,
    call: impl FnOnce() -> AssetResult<T>,
) -> AssetResult<T> {
    catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|_| {
        Err(AssetError::BackendPanicked {
            backend: backend.name().to_string(),
            context: context.to_string(),
        })
    })
}

/// Validate (when configured) and construct an unloaded resource bound to `backend`.
pub fn prepare_resource(
    backend: &Arc<dyn ResourceBackend>,
    path: &str,
    resource_type: ResourceType,
    config: &LoadConfig,
    reader: &Arc<FileReader>,
) -> AssetResult<Arc<Resource>> {
    let source = ResourceSource::parse(path);
    if config.validate_on_load {
        guard_backend(backend.as_ref(), &source.display_path(), || {
            backend.validate_resource_file(&source, resource_type, reader)
        })?;
    }

    Ok(Arc::new(Resource::new(
        path,
        resource_type,
        PayloadProvider::Backend {
            backend: Arc::clone(backend),
            reader: Arc::clone(reader),
        },
        config.clone(),
    )))
}

/// Standalone loading straight through a backend, without a manager.
pub trait BackendExt {
    /// Validate, construct and load on the calling thread.
    fn load_sync(
        &self,
        path: &str,
        resource_type: ResourceType,
        config: &LoadConfig,
        reader: &Arc<FileReader>,
    ) -> Option<Arc<Resource>>;

    /// Validate and construct, then load on a background thread.
    ///
    /// The handle is returned immediately in `Loading` state.
    fn load_async(
        &self,
        path: &str,
        resource_type: ResourceType,
        config: &LoadConfig,
        reader: &Arc<FileReader>,
        callback: impl FnOnce(bool) + Send + 'static,
    ) -> Option<Arc<Resource>>;
}

impl BackendExt for Arc<dyn ResourceBackend> {
    fn load_sync(
        &self,
        path: &str,
        resource_type: ResourceType,
        config: &LoadConfig,
        reader: &Arc<FileReader>,
    ) -> Option<Arc<Resource>> {
        let resource = match prepare_resource(self, path, resource_type, config, reader) {
            Ok(resource) => resource,
            Err(err) => {
                tracing::warn!("Backend '{}' rejected '{}': {}", self.name(), path, err);
                return None;
            }
        };
        resource.load_sync().then_some(resource)
    }

    fn load_async(
        &self,
        path: &str,
        resource_type: ResourceType,
        config: &LoadConfig,
        reader: &Arc<FileReader>,
        callback: impl FnOnce(bool) + Send + 'static,
    ) -> Option<Arc<Resource>> {
        let resource = match prepare_resource(self, path, resource_type, config, reader) {
            Ok(resource) => resource,
            Err(err) => {
                tracing::warn!("Backend '{}' rejected '{}': {}", self.name(), path, err);
                return None;
            }
        };
        resource.load_async(callback);
        Some(resource)
    }
}

impl fmt::Debug for dyn ResourceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBackend")
            .field("name", &self.name())
            .field("capabilities", self.capabilities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct RawBackend {
        capabilities: BackendCapabilities,
        stats: BackendStats,
    }

    impl RawBackend {
        fn new() -> Self {
            Self {
                capabilities: BackendCapabilities::new(&[ResourceType::Data], &["bin", "DAT"]),
                stats: BackendStats::default(),
            }
        }
    }

    impl ResourceBackend for RawBackend {
        fn name(&self) -> &str {
            "raw"
        }

        fn capabilities(&self) -> &BackendCapabilities {
            &self.capabilities
        }

        fn decode(&self, ctx: LoadContext<'_>) -> AssetResult<ResourceData> {
            let result = if ctx.bytes.starts_with(b"BAD") {
                Err(ctx.error("bad magic"))
            } else {
                Ok(ResourceData::Bytes(Arc::from(ctx.bytes)))
            };
            self.stats.record(result)
        }

        fn statistics(&self) -> String {
            self.stats.summary(self.name())
        }
    }

    fn raw() -> Arc<dyn ResourceBackend> {
        Arc::new(RawBackend::new())
    }

    #[test]
    fn test_capabilities_are_case_insensitive() {
        let caps = BackendCapabilities::new(&[ResourceType::Data], &["BIN"]);
        assert!(caps.supports_format("bin"));
        assert!(caps.supports_format(".Bin"));
        assert!(!caps.supports_format("txt"));
        assert!(caps.supports_type(ResourceType::Data));
        assert!(!caps.supports_type(ResourceType::Texture));
    }

    #[test]
    fn test_default_supports_use_capabilities() {
        let backend = raw();
        assert!(backend.supports_file_format("dat"));
        assert_eq!(backend.supported_resource_types(), vec![ResourceType::Data]);
        assert_eq!(backend.supported_file_formats(), vec!["bin", "dat"]);
    }

    #[test]
    fn test_validate_rejects_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"abc").unwrap();
        let reader = FileReader::new(dir.path());
        let source = ResourceSource::parse("a.bin");

        let backend = raw();
        assert!(backend
            .validate_resource_file(&source, ResourceType::Data, &reader)
            .is_ok());
        assert!(matches!(
            backend.validate_resource_file(&source, ResourceType::Texture, &reader),
            Err(AssetError::NoBackend { .. })
        ));
    }

    #[test]
    fn test_standalone_load_sync() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.bin"), b"abc").unwrap();
        std::fs::write(dir.path().join("bad.bin"), b"BAD!").unwrap();
        let reader = Arc::new(FileReader::new(dir.path()));
        let backend = raw();
        let config = LoadConfig::default();

        let res = backend
            .load_sync("good.bin", ResourceType::Data, &config, &reader)
            .expect("good file loads");
        assert_eq!(res.size(), 3);
        assert!(backend
            .load_sync("bad.bin", ResourceType::Data, &config, &reader)
            .is_none());
        assert!(backend
            .load_sync("missing.bin", ResourceType::Data, &config, &reader)
            .is_none());
        assert_eq!(backend.statistics(), "raw: 1 decoded, 1 failed, 3 bytes");
    }

    #[test]
    fn test_standalone_load_async() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.bin"), b"abcd").unwrap();
        let reader = Arc::new(FileReader::new(dir.path()));
        let (tx, rx) = std::sync::mpsc::channel();

        let res = raw()
            .load_async(
                "good.bin",
                ResourceType::Data,
                &LoadConfig::default(),
                &reader,
                move |ok| tx.send(ok).unwrap(),
            )
            .unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        assert!(res.is_loaded());
    }
}
