//! Resource manager - the cache, worker pool and load queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use quarry_core::alloc::HashMap;

use crate::backend::{ResourceBackend, guard_backend, prepare_resource};
use crate::error::{AssetError, AssetResult};
use crate::event::{ResourceEvent, ResourceEventBuffer};
use crate::io::FileReader;
use crate::queue::{LoadQueue, QueuedLoad};
use crate::registry::BackendRegistry;
use crate::resource::{Resource, ResourceGenerator, run_callback};
use crate::source::ResourceSource;
use crate::statistics::{LoadCounters, ResourceStatistics, average};
use crate::types::{CachePolicy, LoadConfig, LoadMode, ResourceState, ResourceType};

/// Minimum worker count when sizing from the CPU count.
pub const MIN_WORKER_THREADS: usize = 2;

/// Settings for a [`ResourceManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Worker count override. `None` uses `max(num_cpus, 2)`.
    pub worker_threads: Option<usize>,
    /// Directory relative resource paths are resolved against.
    pub base_path: PathBuf,
    /// Config used by `load_sync`/`load_async` when none is given.
    pub default_load_config: LoadConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            base_path: PathBuf::from("."),
            default_load_config: LoadConfig::default(),
        }
    }
}

impl ManagerConfig {
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads.max(1));
        self
    }

    pub fn with_base_path(mut self, base_path: impl AsRef<Path>) -> Self {
        self.base_path = base_path.as_ref().to_path_buf();
        self
    }

    pub fn with_default_load_config(mut self, config: LoadConfig) -> Self {
        self.default_load_config = config;
        self
    }

    /// The number of workers `initialize` will spawn.
    pub fn resolved_worker_threads(&self) -> usize {
        self.worker_threads
            .unwrap_or_else(|| num_cpus::get().max(MIN_WORKER_THREADS))
    }
}

/// State shared between the manager handle and its workers.
struct ManagerShared {
    label: String,
    registry: Arc<BackendRegistry>,
    reader: Arc<FileReader>,
    config: ManagerConfig,
    cache: Mutex<HashMap<String, Arc<Resource>>>,
    queue: Mutex<LoadQueue>,
    queue_signal: Condvar,
    /// Backend instances created through the registry, by name.
    backends: Mutex<HashMap<String, Arc<dyn ResourceBackend>>>,
    counters: LoadCounters,
    events: Mutex<ResourceEventBuffer>,
}

impl ManagerShared {
    fn worker_loop(self: Arc<Self>) {
        loop {
            let task = {
                let mut queue = self.queue.lock();
                loop {
                    if queue.stopping {
                        return;
                    }
                    if let Some(task) = queue.pop() {
                        break task;
                    }
                    self.queue_signal.wait(&mut queue);
                }
            };
            self.run_queued(task);
        }
    }

    fn run_queued(&self, task: QueuedLoad) {
        let resource = task.resource;
        let started = Instant::now();
        let success = resource.load_sync();
        self.counters.record_load(success, started.elapsed());

        if success {
            self.events.lock().push(ResourceEvent::Loaded {
                id: resource.id(),
                path: resource.path().to_string(),
                resource_type: resource.resource_type(),
            });
        } else {
            if task.cached {
                self.remove_if_same(&resource);
            }
            self.push_failure(
                resource.path(),
                resource.resource_type(),
                resource.last_error().unwrap_or_default(),
            );
        }

        if let Some(callback) = task.callback {
            run_callback(resource.path(), callback, success);
        }
    }

    /// Remove `resource` from the cache only if the entry is that same instance.
    fn remove_if_same(&self, resource: &Arc<Resource>) {
        let mut cache = self.cache.lock();
        if cache
            .get(resource.path())
            .is_some_and(|cached| Arc::ptr_eq(cached, resource))
        {
            cache.remove(resource.path());
        }
    }

    fn push_failure(&self, path: &str, resource_type: ResourceType, error: String) {
        self.events.lock().push(ResourceEvent::LoadFailed {
            path: path.to_string(),
            resource_type,
            error,
        });
    }
}

/// Owns the path-to-resource cache and a pool of loader threads.
///
/// Backends are looked up in the shared [`BackendRegistry`] by resource type
/// and file extension. All operations take `&self`; the manager can be shared
/// behind an `Arc`.
///
/// # Example
///
/// ```ignore
/// let registry = Arc::new(BackendRegistry::new());
/// register_builtin_backends(&registry);
///
/// let manager = ResourceManager::new("textures", registry, ManagerConfig::default());
/// manager.initialize();
///
/// let logo = manager.load_sync("ui/logo.png", ResourceType::Texture);
/// manager.load_async("ui/background.png", ResourceType::Texture, |ok| {
///     tracing::info!("background loaded: {}", ok);
/// });
/// ```
pub struct ResourceManager {
    shared: Arc<ManagerShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    initialized: AtomicBool,
}

impl ResourceManager {
    /// Create a manager. No threads are started until [`initialize`](Self::initialize).
    pub fn new(label: impl Into<String>, registry: Arc<BackendRegistry>, config: ManagerConfig) -> Self {
        let reader = Arc::new(FileReader::new(&config.base_path));
        Self {
            shared: Arc::new(ManagerShared {
                label: label.into(),
                registry,
                reader,
                config,
                cache: Mutex::new(HashMap::new()),
                queue: Mutex::new(LoadQueue::default()),
                queue_signal: Condvar::new(),
                backends: Mutex::new(HashMap::new()),
                counters: LoadCounters::default(),
                events: Mutex::new(ResourceEventBuffer::new()),
            }),
            workers: Mutex::new(Vec::new()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.shared.registry
    }

    pub fn reader(&self) -> &Arc<FileReader> {
        &self.shared.reader
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    /// Start the worker pool. Idempotent; returns `false` if no worker could start.
    pub fn initialize(&self) -> bool {
        let mut workers = self.workers.lock();
        if self.initialized.load(Ordering::Acquire) {
            return true;
        }

        self.shared.queue.lock().stopping = false;

        let count = self.shared.config.resolved_worker_threads();
        for i in 0..count {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("quarry-{}-{}", self.shared.label, i))
                .spawn(move || shared.worker_loop());
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => tracing::error!("Failed to spawn {} worker {}: {}", self.shared.label, i, err),
            }
        }

        if workers.is_empty() {
            tracing::error!("{} manager has no workers", self.shared.label);
            return false;
        }

        self.initialized.store(true, Ordering::Release);
        tracing::debug!("{} manager started {} workers", self.shared.label, workers.len());
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Stop workers, fail queued loads, unload and clear the cache.
    ///
    /// Loads already running finish before this returns.
    pub fn shutdown(&self) {
        let mut workers = self.workers.lock();

        {
            let mut queue = self.shared.queue.lock();
            queue.stopping = true;
        }
        self.shared.queue_signal.notify_all();

        let stopped = workers.len();
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("{} worker panicked", self.shared.label);
            }
        }

        let pending = self.shared.queue.lock().drain();
        if !pending.is_empty() {
            tracing::debug!(
                "{} manager failing {} queued loads",
                self.shared.label,
                pending.len()
            );
        }
        for task in pending {
            if let Some(callback) = task.callback {
                run_callback(task.resource.path(), callback, false);
            }
            task.resource.abandon_load("manager shut down before the load ran");
        }

        let was_initialized = self.initialized.swap(false, Ordering::AcqRel);
        drop(workers);

        self.unload_all();

        let backends: Vec<_> = self.shared.backends.lock().drain().map(|(_, b)| b).collect();
        for backend in backends {
            let stopped = guard_backend(backend.as_ref(), "shutdown", || {
                backend.shutdown();
                Ok(())
            });
            if let Err(err) = stopped {
                tracing::error!("{}", err);
            }
        }

        if was_initialized || stopped > 0 {
            tracing::debug!("{} manager shut down", self.shared.label);
        }
    }

    /// Load with the manager's default config.
    pub fn load_sync(&self, path: &str, resource_type: ResourceType) -> Option<Arc<Resource>> {
        let config = self.shared.config.default_load_config.clone();
        self.load_sync_with_config(path, resource_type, &config)
    }

    /// Load on the calling thread, or return the cached handle.
    pub fn load_sync_with_config(
        &self,
        path: &str,
        resource_type: ResourceType,
        config: &LoadConfig,
    ) -> Option<Arc<Resource>> {
        if let Some(cached) = self.lookup(path) {
            return Some(cached);
        }

        let resource = self.create_or_reject(path, resource_type, config)?;

        let started = Instant::now();
        let success = resource.load_sync();
        self.shared.counters.record_load(success, started.elapsed());

        if !success {
            self.shared
                .push_failure(path, resource_type, resource.last_error().unwrap_or_default());
            return None;
        }

        let resource = if config.cache_policy == CachePolicy::Cache {
            let mut cache = self.shared.cache.lock();
            // Another thread may have populated the entry while we loaded.
            Arc::clone(
                cache
                    .entry(path.to_string())
                    .or_insert_with(|| Arc::clone(&resource)),
            )
        } else {
            resource
        };

        self.shared.events.lock().push(ResourceEvent::Loaded {
            id: resource.id(),
            path: path.to_string(),
            resource_type,
        });
        Some(resource)
    }

    /// Queue a load with the manager's default config.
    pub fn load_async(
        &self,
        path: &str,
        resource_type: ResourceType,
        callback: impl FnOnce(bool) + Send + 'static,
    ) -> Option<Arc<Resource>> {
        let config = self.shared.config.default_load_config.clone();
        self.load_async_with_config(path, resource_type, &config, callback)
    }

    /// Queue a load on the worker pool.
    ///
    /// A cache hit on a loaded resource calls `callback(true)` before
    /// returning. A hit on a resource still loading defers the callback until
    /// that load completes. Otherwise the resource is inserted in `Loading`
    /// state and the callback runs on a worker thread. It is always invoked
    /// exactly once.
    pub fn load_async_with_config(
        &self,
        path: &str,
        resource_type: ResourceType,
        config: &LoadConfig,
        callback: impl FnOnce(bool) + Send + 'static,
    ) -> Option<Arc<Resource>> {
        if !self.is_initialized() {
            tracing::warn!(
                "{} manager used before initialize(), starting workers now",
                self.shared.label
            );
            self.initialize();
        }

        if let Some(cached) = self.lookup(path) {
            cached.when_loaded(callback);
            return Some(cached);
        }

        let Some(resource) = self.create_or_reject(path, resource_type, config) else {
            callback(false);
            return None;
        };
        resource.mark_loading();

        let cached = config.cache_policy == CachePolicy::Cache;
        if cached {
            let mut cache = self.shared.cache.lock();
            if let Some(existing) = cache.get(path).cloned() {
                drop(cache);
                existing.when_loaded(callback);
                return Some(existing);
            }
            cache.insert(path.to_string(), Arc::clone(&resource));
        }

        let mut queue = self.shared.queue.lock();
        if queue.stopping {
            drop(queue);
            tracing::warn!("{} manager is shutting down, refusing '{}'", self.shared.label, path);
            if cached {
                self.shared.remove_if_same(&resource);
            }
            resource.abandon_load("manager is shutting down");
            callback(false);
            return None;
        }
        queue.push(
            Arc::clone(&resource),
            config.priority,
            cached,
            Some(Box::new(callback)),
        );
        drop(queue);
        self.shared.queue_signal.notify_one();

        Some(resource)
    }

    /// Dispatch on `config.mode`. Async and streaming loads return the handle
    /// immediately, in `Loading` state.
    pub fn load(
        &self,
        path: &str,
        resource_type: ResourceType,
        config: &LoadConfig,
    ) -> Option<Arc<Resource>> {
        match config.mode {
            LoadMode::Sync => self.load_sync_with_config(path, resource_type, config),
            LoadMode::Async | LoadMode::Streaming => {
                self.load_async_with_config(path, resource_type, config, |_| {})
            }
        }
    }

    /// Build an unloaded resource bound to the selected backend.
    pub fn create_resource(
        &self,
        path: &str,
        resource_type: ResourceType,
        config: &LoadConfig,
    ) -> AssetResult<Arc<Resource>> {
        let source = ResourceSource::parse(path);
        let backend = self.select_backend(&source, resource_type)?;
        prepare_resource(&backend, path, resource_type, config, &self.shared.reader)
    }

    fn create_or_reject(
        &self,
        path: &str,
        resource_type: ResourceType,
        config: &LoadConfig,
    ) -> Option<Arc<Resource>> {
        match self.create_resource(path, resource_type, config) {
            Ok(resource) => Some(resource),
            Err(err) => {
                tracing::warn!("Cannot load {} '{}': {}", resource_type, path, err);
                self.shared.counters.record_rejected();
                self.shared.push_failure(path, resource_type, err.to_string());
                None
            }
        }
    }

    /// Pick the first usable backend for the source.
    fn select_backend(
        &self,
        source: &ResourceSource,
        resource_type: ResourceType,
    ) -> AssetResult<Arc<dyn ResourceBackend>> {
        let registry = &self.shared.registry;
        let extension = source.extension();

        let candidates = if source.is_virtual() {
            registry.backends_for_resource_type(resource_type)
        } else {
            match &extension {
                Some(ext) => registry.backends_for(resource_type, ext),
                None => Vec::new(),
            }
        };

        if candidates.is_empty() {
            if !source.is_virtual() && !registry.backends_for_resource_type(resource_type).is_empty() {
                return Err(AssetError::UnsupportedFormat {
                    path: source.display_path(),
                    extension: extension.unwrap_or_default(),
                });
            }
            return Err(AssetError::NoBackend {
                resource_type,
                path: source.display_path(),
            });
        }

        candidates
            .iter()
            .find_map(|name| self.backend_instance(name))
            .ok_or_else(|| AssetError::NoBackend {
                resource_type,
                path: source.display_path(),
            })
    }

    /// Get (or create and initialize) the instance of a registered backend.
    fn backend_instance(&self, name: &str) -> Option<Arc<dyn ResourceBackend>> {
        if let Some(backend) = self.shared.backends.lock().get(name) {
            return Some(Arc::clone(backend));
        }

        let backend = self.shared.registry.create_backend(name)?;
        if let Err(err) = guard_backend(backend.as_ref(), "initialize", || backend.initialize()) {
            tracing::error!("Backend '{}' failed to initialize: {}", name, err);
            return None;
        }

        let mut backends = self.shared.backends.lock();
        Some(Arc::clone(
            backends.entry(name.to_string()).or_insert(backend),
        ))
    }

    /// Cache lookup that counts hits and misses.
    fn lookup(&self, path: &str) -> Option<Arc<Resource>> {
        let cached = self.shared.cache.lock().get(path).cloned();
        match cached {
            Some(resource) => {
                self.shared.counters.record_hit();
                Some(resource)
            }
            None => {
                self.shared.counters.record_miss();
                None
            }
        }
    }

    /// Look up a cached resource. Never loads.
    pub fn get_resource(&self, path: &str) -> Option<Arc<Resource>> {
        self.lookup(path)
    }

    /// Check the cache without touching the hit/miss counters.
    pub fn contains(&self, path: &str) -> bool {
        self.shared.cache.lock().contains_key(path)
    }

    /// Whether this exact instance is the cached entry for its path.
    /// Does not touch the hit/miss counters.
    pub fn is_cached(&self, resource: &Arc<Resource>) -> bool {
        self.shared
            .cache
            .lock()
            .get(resource.path())
            .is_some_and(|cached| Arc::ptr_eq(cached, resource))
    }

    /// Load a runtime-constructed resource and cache it under `path`.
    ///
    /// Replaces any existing entry; holders of the old handle keep it.
    pub fn insert_generated(
        &self,
        path: &str,
        resource_type: ResourceType,
        generator: ResourceGenerator,
    ) -> Option<Arc<Resource>> {
        let resource = Arc::new(Resource::generated(path, resource_type, generator));

        let started = Instant::now();
        let success = resource.load_sync();
        self.shared.counters.record_load(success, started.elapsed());
        if !success {
            self.shared
                .push_failure(path, resource_type, resource.last_error().unwrap_or_default());
            return None;
        }

        self.insert_resource(Arc::clone(&resource));
        self.shared.events.lock().push(ResourceEvent::Loaded {
            id: resource.id(),
            path: path.to_string(),
            resource_type,
        });
        Some(resource)
    }

    /// Cache an externally constructed resource under its own path.
    pub fn insert_resource(&self, resource: Arc<Resource>) -> Option<Arc<Resource>> {
        self.shared
            .cache
            .lock()
            .insert(resource.path().to_string(), resource)
    }

    /// Reload a cached resource in place. A failed reload evicts it.
    pub fn reload_resource(&self, path: &str) -> bool {
        let Some(resource) = self.shared.cache.lock().get(path).cloned() else {
            tracing::warn!("Cannot reload '{}': not cached", path);
            return false;
        };

        let started = Instant::now();
        let success = resource.reload();
        self.shared.counters.record_load(success, started.elapsed());

        if success {
            self.shared.events.lock().push(ResourceEvent::Reloaded {
                id: resource.id(),
                path: path.to_string(),
                resource_type: resource.resource_type(),
            });
        } else {
            self.shared.remove_if_same(&resource);
            self.shared.push_failure(
                path,
                resource.resource_type(),
                resource.last_error().unwrap_or_default(),
            );
        }
        success
    }

    /// Unload and drop a cached resource. Returns `false` if it was not cached.
    pub fn unload_resource(&self, path: &str) -> bool {
        let Some(resource) = self.shared.cache.lock().remove(path) else {
            return false;
        };
        resource.unload();
        self.shared.events.lock().push(ResourceEvent::Unloaded {
            id: resource.id(),
            path: path.to_string(),
        });
        true
    }

    /// Unload every cached resource and clear the cache.
    pub fn unload_all(&self) {
        let drained: Vec<_> = self.shared.cache.lock().drain().collect();
        if drained.is_empty() {
            return;
        }

        let mut events = Vec::with_capacity(drained.len());
        for (path, resource) in drained {
            resource.unload();
            events.push(ResourceEvent::Unloaded {
                id: resource.id(),
                path,
            });
        }

        tracing::debug!("{} manager unloaded {} resources", self.shared.label, events.len());
        let mut buffer = self.shared.events.lock();
        for event in events {
            buffer.push(event);
        }
    }

    /// Evict every cached resource whose reference count is zero.
    ///
    /// Resources still loading are kept. Returns the number evicted.
    pub fn cleanup_unused_resources(&self) -> usize {
        let evicted: Vec<_> = {
            let mut cache = self.shared.cache.lock();
            let unused: Vec<String> = cache
                .iter()
                .filter(|(_, r)| r.ref_count() == 0 && r.state() != ResourceState::Loading)
                .map(|(path, _)| path.clone())
                .collect();
            unused
                .into_iter()
                .filter_map(|path| cache.remove(&path).map(|r| (path, r)))
                .collect()
        };

        for (path, resource) in &evicted {
            resource.unload();
            self.shared.events.lock().push(ResourceEvent::Evicted {
                id: resource.id(),
                path: path.clone(),
            });
        }

        if !evicted.is_empty() {
            tracing::debug!("{} manager evicted {} unused resources", self.shared.label, evicted.len());
        }
        evicted.len()
    }

    /// Handles of every cached resource.
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        self.shared.cache.lock().values().cloned().collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.shared.cache.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.shared.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads waiting for a worker.
    pub fn queued_task_count(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Take the events emitted since the last call.
    pub fn drain_events(&self) -> Vec<ResourceEvent> {
        self.shared.events.lock().take()
    }

    /// Statistics snapshot. Lookup and load counters are read lock-free.
    pub fn statistics(&self) -> ResourceStatistics {
        let counters = &self.shared.counters;
        let mut stats = ResourceStatistics {
            cache_hits: counters.cache_hits(),
            cache_misses: counters.cache_misses(),
            total_loads: counters.total_loads(),
            failed_loads: counters.failed_loads(),
            total_load_time: counters.total_load_time(),
            average_load_time: average(counters.total_load_time(), counters.total_loads()),
            ..Default::default()
        };

        let cache = self.shared.cache.lock();
        stats.total_resources = cache.len();
        stats.cached_resources = cache.len();
        for resource in cache.values() {
            match resource.state() {
                ResourceState::Loaded => stats.loaded_resources += 1,
                ResourceState::Failed => stats.failed_resources += 1,
                _ => {}
            }
            stats.memory_usage += resource.size();
        }
        stats
    }

    /// Statistics of every backend instance this manager created.
    pub fn backend_statistics(&self) -> Vec<String> {
        self.shared
            .backends
            .lock()
            .values()
            .map(|b| b.statistics())
            .collect()
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("label", &self.shared.label)
            .field("initialized", &self.is_initialized())
            .field("cached", &self.len())
            .finish()
    }
}
