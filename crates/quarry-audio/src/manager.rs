use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use quarry_assets::{
    BackendRegistry, DEFAULT_BACKEND_PRIORITY, ManagerConfig, Resource, ResourceBackend,
    ResourceManager, ResourceType,
};

use crate::backend::AudioBackend;
use crate::engine::AudioEngine;
use crate::playback::PlaybackId;

/// Resource manager for audio clips, with playback control.
///
/// Registers its [`AudioBackend`] as `"audio"` in the shared registry; the
/// factory hands out this manager's instance so loads and playback share
/// one engine.
pub struct AudioManager {
    manager: ResourceManager,
    backend: Arc<AudioBackend>,
    /// Whether the registry entry is ours to remove on drop.
    registered: bool,
}

impl AudioManager {
    pub fn new(
        registry: Arc<BackendRegistry>,
        config: ManagerConfig,
        engine: Arc<dyn AudioEngine>,
    ) -> Self {
        let backend = Arc::new(AudioBackend::new(engine));

        let shared = Arc::clone(&backend);
        let registered = registry.register_backend(
            AudioBackend::NAME,
            AudioBackend::describe(),
            DEFAULT_BACKEND_PRIORITY,
            move || Ok(Arc::clone(&shared) as Arc<dyn ResourceBackend>),
        );
        if !registered {
            tracing::warn!("An audio backend is already registered; playback uses this manager's engine");
        }

        Self {
            manager: ResourceManager::new("audio", registry, config),
            backend,
            registered,
        }
    }

    /// Start workers and the audio engine.
    pub fn initialize(&self) -> bool {
        let workers = self.manager.initialize();
        match self.backend.initialize() {
            Ok(()) => workers,
            Err(err) => {
                tracing::error!("Audio engine failed to start: {}", err);
                false
            }
        }
    }

    /// Stop all playback, then shut the manager down.
    pub fn shutdown(&self) {
        self.backend.stop_all_audio();
        self.backend.update(Duration::ZERO);
        self.manager.shutdown();
        self.backend.shutdown();
    }

    pub fn load_audio(&self, path: &str) -> Option<Arc<Resource>> {
        self.manager.load_sync(path, ResourceType::Audio)
    }

    pub fn load_audio_async(
        &self,
        path: &str,
        callback: impl FnOnce(bool) + Send + 'static,
    ) -> Option<Arc<Resource>> {
        self.manager.load_async(path, ResourceType::Audio, callback)
    }

    /// Load (or fetch) a clip and start playing it.
    pub fn play(&self, path: &str, looping: bool, volume: f32) -> PlaybackId {
        match self.load_audio(path) {
            Some(resource) => self.backend.play_audio(&resource, looping, volume),
            None => PlaybackId::INVALID,
        }
    }

    pub fn play_audio(&self, resource: &Arc<Resource>, looping: bool, volume: f32) -> PlaybackId {
        self.backend.play_audio(resource, looping, volume)
    }

    pub fn stop_audio(&self, id: PlaybackId) -> bool {
        self.backend.stop_audio(id)
    }

    pub fn pause_audio(&self, id: PlaybackId) -> bool {
        self.backend.pause_audio(id)
    }

    pub fn resume_audio(&self, id: PlaybackId) -> bool {
        self.backend.resume_audio(id)
    }

    pub fn set_audio_volume(&self, id: PlaybackId, volume: f32) -> bool {
        self.backend.set_audio_volume(id, volume)
    }

    pub fn stop_all_audio(&self) {
        self.backend.stop_all_audio();
    }

    pub fn update(&self, dt: Duration) {
        self.backend.update(dt);
    }

    pub fn active_playbacks(&self) -> Vec<PlaybackId> {
        self.backend.active_playbacks()
    }

    pub fn backend(&self) -> &Arc<AudioBackend> {
        &self.backend
    }

    pub fn manager(&self) -> &ResourceManager {
        &self.manager
    }
}

impl Deref for AudioManager {
    type Target = ResourceManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

impl Drop for AudioManager {
    fn drop(&mut self) {
        self.backend.shutdown();
        if self.registered {
            self.manager.registry().unregister_backend(AudioBackend::NAME);
        }
    }
}
