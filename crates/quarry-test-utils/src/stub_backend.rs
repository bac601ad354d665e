//! A recording, fault-injecting resource backend.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use quarry_assets::{
    AssetError, AssetResult, BackendCapabilities, BackendRegistry, FileReader, LoadContext,
    ResourceBackend, ResourceData, ResourceSource, ResourceType,
};

/// A call made to a [`StubBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Initialize,
    Shutdown,
    /// Display path of the decoded resource.
    Decode(String),
}

/// Backend that returns raw bytes and records everything it is asked to do.
///
/// Decoding a path listed with [`fail_on`](Self::fail_on) returns a loader
/// error; one listed with [`panic_on`](Self::panic_on) panics. Matching is on
/// the path suffix, so tests can use bare file names. The same goes for
/// validation with [`panic_on_validate`](Self::panic_on_validate).
pub struct StubBackend {
    name: String,
    capabilities: BackendCapabilities,
    fail_on: Vec<String>,
    panic_on: Vec<String>,
    panic_on_validate: Vec<String>,
    panic_on_initialize: bool,
    delay: Duration,
    calls: Mutex<Vec<BackendCall>>,
}

impl StubBackend {
    pub fn new(name: &str, resource_types: &[ResourceType], file_formats: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            capabilities: BackendCapabilities::new(resource_types, file_formats),
            fail_on: Vec::new(),
            panic_on: Vec::new(),
            panic_on_validate: Vec::new(),
            panic_on_initialize: false,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(mut self, path: &str) -> Self {
        self.fail_on.push(path.to_string());
        self
    }

    pub fn panic_on(mut self, path: &str) -> Self {
        self.panic_on.push(path.to_string());
        self
    }

    pub fn panic_on_validate(mut self, path: &str) -> Self {
        self.panic_on_validate.push(path.to_string());
        self
    }

    /// Panic in [`ResourceBackend::initialize`].
    pub fn panic_on_initialize(mut self) -> Self {
        self.panic_on_initialize = true;
        self
    }

    /// Sleep this long in every decode.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Register a factory that hands out this exact instance.
    pub fn register(self: &Arc<Self>, registry: &BackendRegistry, priority: i32) -> bool {
        let shared = Arc::clone(self);
        registry.register_backend(
            self.name.clone(),
            self.capabilities.clone(),
            priority,
            move || Ok(Arc::clone(&shared) as Arc<dyn ResourceBackend>),
        )
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn decode_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::Decode(_)))
    }

    /// Number of decodes of paths ending in `path`.
    pub fn decode_count_for(&self, path: &str) -> usize {
        self.count(|c| matches!(c, BackendCall::Decode(p) if p.ends_with(path)))
    }

    pub fn initialize_count(&self) -> usize {
        self.count(|c| *c == BackendCall::Initialize)
    }

    pub fn shutdown_count(&self) -> usize {
        self.count(|c| *c == BackendCall::Shutdown)
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn matches(list: &[String], path: &str) -> bool {
        list.iter().any(|p| path.ends_with(p.as_str()))
    }
}

impl ResourceBackend for StubBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    fn initialize(&self) -> AssetResult<()> {
        self.calls.lock().push(BackendCall::Initialize);
        if self.panic_on_initialize {
            panic!("stub backend '{}' told to panic on initialize", self.name);
        }
        Ok(())
    }

    fn shutdown(&self) {
        self.calls.lock().push(BackendCall::Shutdown);
    }

    fn validate_resource_file(
        &self,
        source: &ResourceSource,
        resource_type: ResourceType,
        reader: &FileReader,
    ) -> AssetResult<()> {
        let path = source.display_path();
        if Self::matches(&self.panic_on_validate, &path) {
            panic!("stub backend told to panic validating '{}'", path);
        }
        if !self.supports_resource_type(resource_type) {
            return Err(AssetError::NoBackend {
                resource_type,
                path,
            });
        }
        source.validate(reader, |ext| self.supports_file_format(ext))
    }

    fn decode(&self, ctx: LoadContext<'_>) -> AssetResult<ResourceData> {
        let path = ctx.display_path();
        self.calls.lock().push(BackendCall::Decode(path.clone()));

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if Self::matches(&self.panic_on, &path) {
            panic!("stub backend told to panic on '{}'", path);
        }
        if Self::matches(&self.fail_on, &path) {
            return Err(AssetError::loader(path, "stub failure"));
        }

        Ok(ResourceData::Bytes(Arc::from(ctx.bytes)))
    }

    fn statistics(&self) -> String {
        format!("{}: {} decodes", self.name, self.decode_count())
    }
}
