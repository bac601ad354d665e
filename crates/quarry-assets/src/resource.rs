//! The resource contract: a typed, stateful, reference-counted unit of loaded data.
//!
//! A [`Resource`] is always handled through `Arc<Resource>`. The manager's cache
//! holds one strong `Arc`, every caller that received a handle holds another.
//! The explicit reference count tracked by [`Resource::add_ref`] and
//! [`Resource::remove_ref`] is independent of the `Arc` count: it only decides
//! whether `cleanup_unused_resources` may evict the entry. Reaching zero never
//! frees anything by itself.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use quarry_core::alloc::HashMap;

use crate::backend::{LoadContext, ResourceBackend};
use crate::data::{AudioClip, ModelData, ResourceData, ShaderData, TextureData};
use crate::error::{AssetError, AssetResult};
use crate::io::FileReader;
use crate::source::ResourceSource;
use crate::types::{LoadConfig, ResourceState, ResourceType};

/// Process-wide resource id counter. Ids start at 1.
static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Completion callback of a load, called with its outcome.
pub type LoadCallback = Box<dyn FnOnce(bool) + Send>;

/// Closure producing a payload for runtime-constructed resources.
pub type ResourceGenerator = Arc<dyn Fn() -> AssetResult<ResourceData> + Send + Sync>;

/// Where a resource gets its payload from on every (re)load.
#[derive(Clone)]
pub enum PayloadProvider {
    /// Decode through a backend, reading file bytes with `reader`.
    Backend {
        backend: Arc<dyn ResourceBackend>,
        reader: Arc<FileReader>,
    },
    /// Build the payload in-process.
    Generator(ResourceGenerator),
}

impl PayloadProvider {
    fn produce(
        &self,
        source: &ResourceSource,
        resource_type: ResourceType,
        config: &LoadConfig,
    ) -> AssetResult<ResourceData> {
        match self {
            PayloadProvider::Backend { backend, reader } => {
                let bytes = match source.file_path() {
                    Some(path) => reader.read_bytes_sync(path)?,
                    None => Vec::new(),
                };
                let extension = source.extension();
                let ctx = LoadContext {
                    source,
                    resource_type,
                    bytes: &bytes,
                    extension: extension.as_deref(),
                    config,
                };

                catch_unwind(AssertUnwindSafe(|| backend.decode(ctx))).unwrap_or_else(|_| {
                    Err(AssetError::BackendPanicked {
                        backend: backend.name().to_string(),
                        context: source.display_path(),
                    })
                })
            }
            PayloadProvider::Generator(generate) => {
                catch_unwind(AssertUnwindSafe(|| generate())).unwrap_or_else(|_| {
                    Err(AssetError::BackendPanicked {
                        backend: "generator".to_string(),
                        context: source.display_path(),
                    })
                })
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            PayloadProvider::Backend { backend, .. } => backend.name().to_string(),
            PayloadProvider::Generator(_) => "generator".to_string(),
        }
    }
}

/// Mutable part of a resource, guarded by one lock so state and payload
/// never disagree.
#[derive(Default)]
struct Slot {
    state: ResourceState,
    payload: Option<ResourceData>,
    last_error: Option<String>,
    load_time: Option<Duration>,
}

/// A loaded (or loading) unit of typed data.
pub struct Resource {
    id: u64,
    name: String,
    path: String,
    source: ResourceSource,
    resource_type: ResourceType,
    config: LoadConfig,
    provider: PayloadProvider,
    slot: RwLock<Slot>,
    /// Serializes load/unload on this instance.
    load_lock: Mutex<()>,
    /// Callbacks waiting for the load in progress, fired when it finishes.
    waiters: Mutex<Vec<LoadCallback>>,
    ref_count: AtomicU32,
    size: AtomicUsize,
    metadata: Mutex<HashMap<String, String>>,
}

impl Resource {
    /// Create an unloaded resource.
    pub fn new(
        path: impl Into<String>,
        resource_type: ResourceType,
        provider: PayloadProvider,
        config: LoadConfig,
    ) -> Self {
        let path = path.into();
        let source = ResourceSource::parse(&path);
        Self {
            id: NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed),
            name: source.logical_name(),
            path,
            source,
            resource_type,
            config,
            provider,
            slot: RwLock::new(Slot::default()),
            load_lock: Mutex::new(()),
            waiters: Mutex::new(Vec::new()),
            ref_count: AtomicU32::new(0),
            size: AtomicUsize::new(0),
            metadata: Mutex::new(HashMap::new()),
        }
    }

    /// Create an unloaded resource whose payload comes from `generator`.
    pub fn generated(
        path: impl Into<String>,
        resource_type: ResourceType,
        generator: ResourceGenerator,
    ) -> Self {
        Self::new(
            path,
            resource_type,
            PayloadProvider::Generator(generator),
            LoadConfig::default(),
        )
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> &ResourceSource {
        &self.source
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn state(&self) -> ResourceState {
        self.slot.read().state
    }

    /// Estimated payload size in bytes, 0 while unloaded.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Acquire)
    }

    /// Increment the reference count and return the new value.
    pub fn add_ref(&self) -> u32 {
        self.ref_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the reference count (saturating at zero) and return the new value.
    pub fn remove_ref(&self) -> u32 {
        let previous = self
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                Some(count.saturating_sub(1))
            })
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == ResourceState::Loaded
    }

    /// `false` once loading failed or while no payload is present.
    pub fn is_valid(&self) -> bool {
        let slot = self.slot.read();
        slot.state != ResourceState::Failed && slot.payload.is_some()
    }

    /// A clone of the payload, if loaded.
    pub fn data(&self) -> Option<ResourceData> {
        self.slot.read().payload.clone()
    }

    pub fn texture(&self) -> Option<Arc<TextureData>> {
        self.slot.read().payload.as_ref()?.as_texture().cloned()
    }

    pub fn shader(&self) -> Option<Arc<ShaderData>> {
        self.slot.read().payload.as_ref()?.as_shader().cloned()
    }

    pub fn model(&self) -> Option<Arc<ModelData>> {
        self.slot.read().payload.as_ref()?.as_model().cloned()
    }

    pub fn audio(&self) -> Option<Arc<AudioClip>> {
        self.slot.read().payload.as_ref()?.as_audio().cloned()
    }

    /// The message of the most recent load failure.
    pub fn last_error(&self) -> Option<String> {
        self.slot.read().last_error.clone()
    }

    /// Duration of the most recent load attempt.
    pub fn load_time(&self) -> Option<Duration> {
        self.slot.read().load_time
    }

    /// Load the payload on the calling thread.
    ///
    /// Concurrent calls on the same instance are serialized. Callbacks
    /// registered through [`when_loaded`](Self::when_loaded) fire once the
    /// load has finished and the load lock is released.
    pub fn load_sync(&self) -> bool {
        let success = {
            let _loading = self.load_lock.lock();
            self.load_locked()
        };
        self.finish_waiters(success);
        success
    }

    fn load_locked(&self) -> bool {
        self.slot.write().state = ResourceState::Loading;

        let started = Instant::now();
        let result = self.produce_with_retries(started);
        let elapsed = started.elapsed();

        if let Some(timeout) = self.config.timeout
            && elapsed > timeout
        {
            tracing::warn!(
                "Loading '{}' took {:?}, exceeding its {:?} timeout",
                self.path,
                elapsed,
                timeout
            );
        }

        let mut slot = self.slot.write();
        slot.load_time = Some(elapsed);
        match result {
            Ok(data) => {
                self.size.store(data.size_bytes(), Ordering::Release);
                slot.payload = Some(data);
                slot.state = ResourceState::Loaded;
                slot.last_error = None;
                tracing::debug!(
                    "Loaded {} '{}' (id {}) in {:?}",
                    self.resource_type,
                    self.path,
                    self.id,
                    elapsed
                );
                true
            }
            Err(err) => {
                self.size.store(0, Ordering::Release);
                slot.payload = None;
                slot.state = ResourceState::Failed;
                slot.last_error = Some(err.to_string());
                tracing::warn!("Failed to load {} '{}': {}", self.resource_type, self.path, err);
                false
            }
        }
    }

    fn produce_with_retries(&self, started: Instant) -> AssetResult<ResourceData> {
        let mut attempt = 0;
        loop {
            match self
                .provider
                .produce(&self.source, self.resource_type, &self.config)
            {
                Ok(data) => return Ok(data),
                Err(err) => {
                    if err.is_validation() || attempt >= self.config.retry_count {
                        return Err(err);
                    }
                    if let Some(timeout) = self.config.timeout
                        && started.elapsed() >= timeout
                    {
                        tracing::warn!("Giving up on '{}' after {} attempts: timeout", self.path, attempt + 1);
                        return Err(err);
                    }
                    attempt += 1;
                    tracing::debug!(
                        "Retrying '{}' via {} (attempt {}): {}",
                        self.path,
                        self.provider.describe(),
                        attempt,
                        err
                    );
                }
            }
        }
    }

    /// Load on a background thread and report the outcome through `callback`.
    ///
    /// Each call spawns one dedicated `quarry-load-<id>` thread. Pooled loads
    /// go through [`ResourceManager::load_async`](crate::ResourceManager::load_async).
    ///
    /// The callback runs exactly once, on the background thread. If the thread
    /// cannot be spawned the resource is marked failed and the callback runs
    /// with `false` on the calling thread.
    pub fn load_async(self: &Arc<Self>, callback: impl FnOnce(bool) + Send + 'static) {
        type Callback = Box<dyn FnOnce(bool) + Send>;
        let pending: Arc<Mutex<Option<Callback>>> = Arc::new(Mutex::new(Some(Box::new(callback))));

        let resource = Arc::clone(self);
        let worker_pending = Arc::clone(&pending);
        self.slot.write().state = ResourceState::Loading;

        let spawned = thread::Builder::new()
            .name(format!("quarry-load-{}", self.id))
            .spawn(move || {
                let success = resource.load_sync();
                if let Some(callback) = worker_pending.lock().take() {
                    callback(success);
                }
            });

        if let Err(err) = spawned {
            tracing::error!("Failed to spawn load thread for '{}': {}", self.path, err);
            self.abandon_load(&err.to_string());
            if let Some(callback) = pending.lock().take() {
                callback(false);
            }
        }
    }

    /// Run `callback` with the outcome of the load in progress, or right
    /// away with [`is_loaded`](Self::is_loaded) when nothing is loading.
    ///
    /// A deferred callback runs on the thread that finishes the load.
    pub fn when_loaded(&self, callback: impl FnOnce(bool) + Send + 'static) {
        let mut waiters = self.waiters.lock();
        if self.state() == ResourceState::Loading {
            waiters.push(Box::new(callback));
            return;
        }
        drop(waiters);
        run_callback(&self.path, Box::new(callback), self.is_loaded());
    }

    /// Callbacks parked by [`when_loaded`](Self::when_loaded).
    pub fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }

    fn finish_waiters(&self, success: bool) {
        let waiting = std::mem::take(&mut *self.waiters.lock());
        for callback in waiting {
            run_callback(&self.path, callback, success);
        }
    }

    /// Fail a load that was announced with `Loading` but will never run.
    ///
    /// No-op if a load is running on this instance; that load answers the
    /// waiters itself.
    pub(crate) fn abandon_load(&self, reason: &str) {
        let Some(loading) = self.load_lock.try_lock() else {
            return;
        };
        {
            let mut slot = self.slot.write();
            if slot.state != ResourceState::Loading {
                return;
            }
            slot.state = ResourceState::Failed;
            slot.last_error = Some(reason.to_string());
        }
        drop(loading);
        self.finish_waiters(false);
    }

    /// Release the payload. Idempotent.
    pub fn unload(&self) {
        let _loading = self.load_lock.lock();

        let payload = {
            let mut slot = self.slot.write();
            if slot.state == ResourceState::Unloaded && slot.payload.is_none() {
                return;
            }
            slot.state = ResourceState::Unloading;
            slot.payload.take()
        };
        drop(payload);

        self.size.store(0, Ordering::Release);
        self.slot.write().state = ResourceState::Unloaded;
        tracing::trace!("Unloaded '{}' (id {})", self.path, self.id);
    }

    /// Unload and load again on the calling thread.
    pub fn reload(&self) -> bool {
        self.unload();
        self.load_sync()
    }

    /// Mark an eagerly constructed resource as queued for loading.
    pub(crate) fn mark_loading(&self) {
        self.slot.write().state = ResourceState::Loading;
    }

    pub fn metadata(&self, key: &str) -> Option<String> {
        self.metadata.lock().get(key).cloned()
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.lock().insert(key.into(), value.into());
    }

    pub fn remove_metadata(&self, key: &str) -> Option<String> {
        self.metadata.lock().remove(key)
    }

    /// Snapshot of all metadata entries.
    pub fn metadata_entries(&self) -> Vec<(String, String)> {
        self.metadata
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Invoke a load callback, containing any panic it raises.
pub(crate) fn run_callback(path: &str, callback: LoadCallback, success: bool) {
    if catch_unwind(AssertUnwindSafe(|| callback(success))).is_err() {
        tracing::error!("Load callback for '{}' panicked", path);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("type", &self.resource_type)
            .field("state", &self.state())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// Keeps a resource referenced for as long as the guard lives.
///
/// Creating or cloning a guard calls [`Resource::add_ref`]; dropping it calls
/// [`Resource::remove_ref`]. While any guard exists the resource survives
/// `cleanup_unused_resources`.
pub struct ResourceGuard {
    resource: Arc<Resource>,
}

impl ResourceGuard {
    pub fn new(resource: Arc<Resource>) -> Self {
        resource.add_ref();
        Self { resource }
    }

    /// The guarded handle.
    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }
}

impl Clone for ResourceGuard {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.resource))
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.resource.remove_ref();
    }
}

impl std::ops::Deref for ResourceGuard {
    type Target = Resource;

    fn deref(&self) -> &Self::Target {
        &self.resource
    }
}

impl fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceGuard").field(&self.resource).finish()
    }
}
