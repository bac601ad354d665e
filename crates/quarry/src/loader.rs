//! The application-facing asset loader.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use quarry_assets::{
    BackendRegistry, ModelManager, Resource, ResourceManager, ResourceStatistics, ResourceType,
    ShaderManager, TextureManager, register_builtin_backends,
};
use quarry_audio::{AudioEngine, AudioManager, SilentAudioEngine};
use quarry_core::alloc::HashMap;

use crate::config::LoaderConfig;
use crate::manifest::parse_asset_list;
use crate::task::{TaskId, TaskInfo, TaskKind, TaskSignal, TaskTable};
use crate::task_pool::TaskPool;

/// The typed managers plus the loader's own path shortcut cache.
///
/// Shared with background tasks, which load through it.
struct LoaderState {
    registry: Arc<BackendRegistry>,
    textures: TextureManager,
    shaders: ShaderManager,
    models: ModelManager,
    audio: AudioManager,
    assets: Mutex<HashMap<String, Arc<Resource>>>,
}

impl LoaderState {
    fn managers(&self) -> [&ResourceManager; 4] {
        [
            self.textures.manager(),
            self.shaders.manager(),
            self.models.manager(),
            self.audio.manager(),
        ]
    }

    fn manager_for(&self, resource_type: ResourceType) -> Option<&ResourceManager> {
        match resource_type {
            ResourceType::Texture => Some(self.textures.manager()),
            ResourceType::Shader => Some(self.shaders.manager()),
            ResourceType::Model => Some(self.models.manager()),
            ResourceType::Audio => Some(self.audio.manager()),
            _ => None,
        }
    }

    fn load(&self, path: &str, resource_type: ResourceType) -> Option<Arc<Resource>> {
        let resource = match resource_type {
            ResourceType::Texture => self.textures.load_texture(path),
            ResourceType::Shader => self.shaders.load_shader(path),
            ResourceType::Model => self.models.load_model(path),
            ResourceType::Audio => self.audio.load_audio(path),
            other => {
                tracing::warn!("No manager handles {} resources, skipping '{}'", other, path);
                None
            }
        }?;

        self.assets
            .lock()
            .insert(path.to_string(), Arc::clone(&resource));
        Some(resource)
    }

    /// Whether any manager still caches this exact instance.
    fn is_cached(&self, resource: &Arc<Resource>) -> bool {
        self.managers()
            .into_iter()
            .any(|manager| manager.is_cached(resource))
    }

    /// Load a batch sequentially; failed paths yield `None`.
    fn load_all(&self, paths: &[String], signal: &TaskSignal) -> Vec<Option<Arc<Resource>>> {
        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            if signal.is_cancelled() {
                loaded.push(None);
                continue;
            }
            loaded.push(self.load(path, ResourceType::detect(path)));
        }
        loaded
    }

    fn initialize(&self) -> bool {
        // Start every manager even if one fails.
        let results = [
            self.textures.initialize(),
            self.shaders.initialize(),
            self.models.initialize(),
            self.audio.initialize(),
        ];
        results.iter().all(|ok| *ok)
    }

    fn shutdown(&self) {
        self.audio.shutdown();
        self.textures.shutdown();
        self.shaders.shutdown();
        self.models.shutdown();
        self.assets.lock().clear();
    }
}

/// Front door to the asset system.
///
/// Detects resource types from file extensions, routes loads to the typed
/// managers and tracks async requests as tasks that can be polled, waited on
/// or cancelled. Async work runs on a [`TaskPool`] separate from the
/// managers' own worker threads.
///
/// Callbacks of async requests run on a task pool thread, before the task is
/// marked completed. Cancelling a task is best-effort: a load that already
/// started runs to the end, only its callback is suppressed.
///
/// # Example
///
/// ```ignore
/// use quarry::prelude::*;
///
/// let loader = AssetLoader::new(LoaderConfig::default().with_base_path("assets"));
/// loader.initialize();
///
/// let logo = loader.load_asset("ui/logo.png");
/// let task = loader.load_asset_async("music/theme.ogg", |clip| {
///     tracing::info!("theme loaded: {}", clip.is_some());
/// });
/// loader.wait_for_task(task, Duration::from_secs(1));
/// ```
pub struct AssetLoader {
    config: LoaderConfig,
    state: Arc<LoaderState>,
    pool: RwLock<Option<TaskPool>>,
    tasks: TaskTable,
}

impl AssetLoader {
    /// Create a loader whose audio plays through [`SilentAudioEngine`].
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_audio_engine(config, Arc::new(SilentAudioEngine::new()))
    }

    /// Create a loader with its own registry holding the built-in backends.
    ///
    /// Nothing starts until [`initialize`](Self::initialize).
    pub fn with_audio_engine(config: LoaderConfig, engine: Arc<dyn AudioEngine>) -> Self {
        let registry = Arc::new(BackendRegistry::new());
        register_builtin_backends(&registry);

        let manager_config = config.manager.clone();
        let state = LoaderState {
            textures: TextureManager::new(Arc::clone(&registry), manager_config.clone()),
            shaders: ShaderManager::new(Arc::clone(&registry), manager_config.clone()),
            models: ModelManager::new(Arc::clone(&registry), manager_config.clone()),
            audio: AudioManager::new(Arc::clone(&registry), manager_config, engine),
            registry,
            assets: Mutex::new(HashMap::new()),
        };

        Self {
            config,
            state: Arc::new(state),
            pool: RwLock::new(None),
            tasks: TaskTable::new(),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The registry shared by every manager. Backends registered here are
    /// picked up by subsequent loads.
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.state.registry
    }

    /// Start the managers, the audio engine and the task pool. Idempotent.
    ///
    /// Returns `false` if any manager failed to start; the loader is usable
    /// regardless.
    pub fn initialize(&self) -> bool {
        let mut pool = self.pool.write();
        if pool.is_some() {
            return true;
        }

        let started = self.state.initialize();
        let threads = self.config.resolved_task_threads();
        *pool = Some(TaskPool::new(threads));

        if started {
            tracing::debug!("AssetLoader initialized with {} task threads", threads);
        } else {
            tracing::error!("AssetLoader initialized, but some managers failed to start");
        }
        started
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.read().is_some()
    }

    /// Cancel outstanding tasks, then shut down the pool and every manager.
    ///
    /// Each in-flight task gets up to `shutdown_grace` to finish. Tasks still
    /// running afterwards complete unobserved.
    pub fn shutdown(&self) {
        let Some(pool) = self.pool.write().take() else {
            return;
        };

        let pending = self.tasks.detach_all();
        let grace = self.config.shutdown_grace;
        let mut abandoned = 0;
        for (id, signal) in pending {
            if !signal.wait(grace) {
                tracing::debug!("{} still running at shutdown", id);
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            tracing::warn!("AssetLoader shut down with {} tasks still running", abandoned);
        }

        pool.shutdown();
        self.state.shutdown();
        tracing::debug!("AssetLoader shut down");
    }

    // ------------------------------------------------------------------
    // Synchronous loading
    // ------------------------------------------------------------------

    /// Load a file, detecting its type from the extension.
    pub fn load_asset(&self, path: &str) -> Option<Arc<Resource>> {
        let resource_type = ResourceType::detect(path);
        if resource_type == ResourceType::Unknown {
            tracing::warn!("Cannot detect the resource type of '{}'", path);
            return None;
        }
        self.state.load(path, resource_type)
    }

    pub fn load_texture(&self, path: &str) -> Option<Arc<Resource>> {
        self.state.load(path, ResourceType::Texture)
    }

    pub fn load_shader(&self, path: &str) -> Option<Arc<Resource>> {
        self.state.load(path, ResourceType::Shader)
    }

    pub fn load_model(&self, path: &str) -> Option<Arc<Resource>> {
        self.state.load(path, ResourceType::Model)
    }

    pub fn load_audio(&self, path: &str) -> Option<Arc<Resource>> {
        self.state.load(path, ResourceType::Audio)
    }

    // ------------------------------------------------------------------
    // Tracked async loading
    // ------------------------------------------------------------------

    /// Load a file in the background, detecting its type from the extension.
    ///
    /// Unrecognized extensions are refused: the callback receives `None`
    /// immediately and [`TaskId::INVALID`] is returned.
    pub fn load_asset_async(
        &self,
        path: &str,
        callback: impl FnOnce(Option<Arc<Resource>>) + Send + 'static,
    ) -> TaskId {
        let resource_type = ResourceType::detect(path);
        if resource_type == ResourceType::Unknown {
            tracing::warn!("Cannot detect the resource type of '{}'", path);
            callback(None);
            return TaskId::INVALID;
        }
        self.spawn_load(path, resource_type, callback)
    }

    pub fn load_texture_async(
        &self,
        path: &str,
        callback: impl FnOnce(Option<Arc<Resource>>) + Send + 'static,
    ) -> TaskId {
        self.spawn_load(path, ResourceType::Texture, callback)
    }

    pub fn load_shader_async(
        &self,
        path: &str,
        callback: impl FnOnce(Option<Arc<Resource>>) + Send + 'static,
    ) -> TaskId {
        self.spawn_load(path, ResourceType::Shader, callback)
    }

    pub fn load_model_async(
        &self,
        path: &str,
        callback: impl FnOnce(Option<Arc<Resource>>) + Send + 'static,
    ) -> TaskId {
        self.spawn_load(path, ResourceType::Model, callback)
    }

    pub fn load_audio_async(
        &self,
        path: &str,
        callback: impl FnOnce(Option<Arc<Resource>>) + Send + 'static,
    ) -> TaskId {
        self.spawn_load(path, ResourceType::Audio, callback)
    }

    /// Load every path in one background task, in order.
    ///
    /// The callback runs once with one entry per path; entries of paths that
    /// failed are `None`.
    pub fn load_assets_batch(
        &self,
        paths: &[&str],
        callback: impl FnOnce(Vec<Option<Arc<Resource>>>) + Send + 'static,
    ) -> TaskId {
        let paths: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        let refused = vec![None; paths.len()];
        self.spawn_tracked(
            TaskKind::Batch { count: paths.len() },
            move |state, signal| state.load_all(&paths, signal),
            callback,
            refused,
        )
    }

    /// Read an asset list file and load every path in it in one background
    /// task. An unreadable list yields an empty result.
    pub fn load_assets_from_config(
        &self,
        config_path: &str,
        callback: impl FnOnce(Vec<Option<Arc<Resource>>>) + Send + 'static,
    ) -> TaskId {
        let config_path = config_path.to_string();
        self.spawn_tracked(
            TaskKind::Manifest {
                path: config_path.clone(),
            },
            move |state, signal| {
                let reader = state.textures.reader();
                match reader.read_string_sync(Path::new(&config_path)) {
                    Ok(text) => {
                        let paths = parse_asset_list(&text);
                        tracing::debug!("Asset list '{}' names {} assets", config_path, paths.len());
                        state.load_all(&paths, signal)
                    }
                    Err(err) => {
                        tracing::error!("Cannot read asset list '{}': {}", config_path, err);
                        Vec::new()
                    }
                }
            },
            callback,
            Vec::new(),
        )
    }

    fn spawn_load(
        &self,
        path: &str,
        resource_type: ResourceType,
        callback: impl FnOnce(Option<Arc<Resource>>) + Send + 'static,
    ) -> TaskId {
        let owned = path.to_string();
        self.spawn_tracked(
            TaskKind::Single {
                path: path.to_string(),
                resource_type,
            },
            move |state, _| state.load(&owned, resource_type),
            callback,
            None,
        )
    }

    /// Run `work` on the task pool and deliver its output to `callback`.
    ///
    /// If no pool can be started the callback receives `refused` right away
    /// and [`TaskId::INVALID`] is returned. If `work` panics the callback
    /// receives `refused` and the task still completes.
    fn spawn_tracked<T: Send + 'static>(
        &self,
        kind: TaskKind,
        work: impl FnOnce(&LoaderState, &TaskSignal) -> T + Send + 'static,
        callback: impl FnOnce(T) + Send + 'static,
        refused: T,
    ) -> TaskId {
        if !self.is_initialized() {
            tracing::warn!("AssetLoader used before initialize(), starting now");
            self.initialize();
        }

        let pool = self.pool.read();
        let Some(pool) = pool.as_ref() else {
            tracing::warn!("AssetLoader is shut down, refusing {}", kind);
            callback(refused);
            return TaskId::INVALID;
        };

        let id = self.tasks.allocate_id();
        let signal = TaskSignal::new();
        let state = Arc::clone(&self.state);
        let task_signal = Arc::clone(&signal);

        let handle = pool.spawn(async move {
            if !task_signal.begin() {
                tracing::trace!("{} cancelled before it started", id);
                return;
            }

            let output = match catch_unwind(AssertUnwindSafe(|| work(&state, &task_signal))) {
                Ok(output) => output,
                Err(_) => {
                    tracing::error!("{} panicked while loading", id);
                    refused
                }
            };
            if task_signal.is_cancelled() {
                tracing::trace!("{} was cancelled, dropping its result", id);
            } else if catch_unwind(AssertUnwindSafe(|| callback(output))).is_err() {
                tracing::error!("Callback of {} panicked", id);
            }
            task_signal.finish();
        });

        tracing::trace!("Spawned {} for {}", id, kind);
        self.tasks.insert(id, kind, signal, handle);
        id
    }

    // ------------------------------------------------------------------
    // Task tracking
    // ------------------------------------------------------------------

    /// Detach an in-flight task.
    ///
    /// Waits up to `cancel_grace` for it, then forgets it. A task that has
    /// not started never runs; one already running finishes, but its
    /// callback is not called. Returns `false` for unknown or completed
    /// tasks.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        let Some(signal) = self.tasks.detach(id) else {
            return false;
        };

        if !signal.wait(self.config.cancel_grace) {
            tracing::debug!("{} is still running after cancel; it will finish unobserved", id);
        }
        true
    }

    /// Unknown (reaped or cancelled) tasks count as completed.
    pub fn is_task_completed(&self, id: TaskId) -> bool {
        self.tasks.is_completed(id)
    }

    /// Block until the task completes or `timeout` elapses.
    ///
    /// Returns `true` if the task is completed (or unknown).
    pub fn wait_for_task(&self, id: TaskId, timeout: Duration) -> bool {
        match self.tasks.signal(id) {
            Some(signal) => signal.wait(timeout),
            None => true,
        }
    }

    /// Tracked tasks that have not completed.
    pub fn active_task_count(&self) -> usize {
        self.tasks.active_count()
    }

    /// Tracked tasks, completed or not.
    pub fn tracked_task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn task_info(&self, id: TaskId) -> Option<TaskInfo> {
        self.tasks.info(id)
    }

    /// Forget completed tasks. Returns how many were dropped.
    pub fn reap_completed_tasks(&self) -> usize {
        self.tasks.reap_completed()
    }

    // ------------------------------------------------------------------
    // Cache pass-through
    // ------------------------------------------------------------------

    /// Look up a loaded asset without loading it.
    ///
    /// A shortcut entry whose resource no manager caches anymore (evicted or
    /// unloaded through a typed manager) is dropped and not returned.
    pub fn get_asset(&self, path: &str) -> Option<Arc<Resource>> {
        let shortcut = self.state.assets.lock().get(path).cloned();
        if let Some(resource) = shortcut {
            if self.state.is_cached(&resource) {
                return Some(resource);
            }
            let mut assets = self.state.assets.lock();
            if assets.get(path).is_some_and(|r| Arc::ptr_eq(r, &resource)) {
                assets.remove(path);
            }
        }
        self.state
            .managers()
            .into_iter()
            .find(|manager| manager.contains(path))
            .and_then(|manager| manager.get_resource(path))
    }

    /// Unload an asset from whichever manager holds it.
    pub fn unload_asset(&self, path: &str) -> bool {
        let shortcut = self.state.assets.lock().remove(path).is_some();

        let preferred = self.state.manager_for(ResourceType::detect(path));
        let unloaded = preferred.is_some_and(|manager| manager.unload_resource(path))
            || self
                .state
                .managers()
                .into_iter()
                .any(|manager| manager.unload_resource(path));

        if !unloaded && !shortcut {
            tracing::warn!("Cannot unload '{}': not loaded", path);
        }
        unloaded
    }

    pub fn unload_all_assets(&self) {
        self.state.assets.lock().clear();
        for manager in self.state.managers() {
            manager.unload_all();
        }
    }

    /// Every cached asset across all managers.
    pub fn all_assets(&self) -> Vec<Arc<Resource>> {
        self.state
            .managers()
            .into_iter()
            .flat_map(|manager| manager.resources())
            .collect()
    }

    /// Statistics of all managers combined.
    pub fn statistics(&self) -> ResourceStatistics {
        let mut total = ResourceStatistics::default();
        for manager in self.state.managers() {
            total.merge(&manager.statistics());
        }
        total
    }

    /// Evict unreferenced assets from every manager. Returns the number evicted.
    pub fn cleanup_unused_assets(&self) -> usize {
        let evicted: usize = self
            .state
            .managers()
            .into_iter()
            .map(|manager| manager.cleanup_unused_resources())
            .sum();

        if evicted > 0 {
            self.state
                .assets
                .lock()
                .retain(|_, resource| self.state.is_cached(resource));
        }
        evicted
    }

    /// Per-frame maintenance: advance audio playback and forget completed tasks.
    pub fn update(&self, dt: Duration) {
        self.state.audio.update(dt);
        self.tasks.reap_completed();
    }

    // ------------------------------------------------------------------
    // Typed managers
    // ------------------------------------------------------------------

    pub fn textures(&self) -> &TextureManager {
        &self.state.textures
    }

    pub fn shaders(&self) -> &ShaderManager {
        &self.state.shaders
    }

    pub fn models(&self) -> &ModelManager {
        &self.state.models
    }

    pub fn audio(&self) -> &AudioManager {
        &self.state.audio
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}
