//! Audio backend: clip decoding plus the playback table.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use quarry_assets::{
    AssetResult, BackendCapabilities, BackendStats, LoadContext, Resource, ResourceBackend,
    ResourceData, ResourceGuard, ResourceSource, ResourceType,
};
use quarry_core::alloc::HashMap;

use crate::decoder::{AUDIO_FORMATS, decode_clip};
use crate::engine::AudioEngine;
use crate::playback::{AudioPlayback, PlaybackId, clamp_volume};

/// Decodes audio clips and plays them through an [`AudioEngine`].
///
/// One instance owns the engine and every playback. Register it with a
/// factory that hands out that same instance (see
/// [`AudioManager`](crate::AudioManager)).
pub struct AudioBackend {
    capabilities: BackendCapabilities,
    engine: Arc<dyn AudioEngine>,
    playbacks: Mutex<HashMap<PlaybackId, AudioPlayback>>,
    next_id: AtomicU64,
    initialized: AtomicBool,
    stats: BackendStats,
}

impl AudioBackend {
    pub const NAME: &'static str = "audio";

    pub fn new(engine: Arc<dyn AudioEngine>) -> Self {
        Self {
            capabilities: Self::describe(),
            engine,
            playbacks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            initialized: AtomicBool::new(false),
            stats: BackendStats::default(),
        }
    }

    pub fn describe() -> BackendCapabilities {
        BackendCapabilities::new(&[ResourceType::Audio], AUDIO_FORMATS)
    }

    pub fn engine(&self) -> &Arc<dyn AudioEngine> {
        &self.engine
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Start playing a loaded audio resource.
    ///
    /// Returns [`PlaybackId::INVALID`] when the resource is not a loaded audio
    /// clip or the engine cannot create a sound.
    pub fn play_audio(&self, resource: &Arc<Resource>, looping: bool, volume: f32) -> PlaybackId {
        if resource.resource_type() != ResourceType::Audio {
            tracing::warn!(
                "Cannot play '{}': it is a {} resource",
                resource.path(),
                resource.resource_type()
            );
            return PlaybackId::INVALID;
        }

        let Some(clip) = resource.audio().filter(|_| resource.is_loaded()) else {
            tracing::warn!("Cannot play '{}': not loaded", resource.path());
            return PlaybackId::INVALID;
        };

        let mut sound = match self.engine.create_sound(clip) {
            Ok(sound) => sound,
            Err(err) => {
                tracing::error!("Engine '{}' failed to create sound: {}", self.engine.name(), err);
                return PlaybackId::INVALID;
            }
        };

        let volume = clamp_volume(volume);
        sound.set_looping(looping);
        sound.set_volume(volume);
        sound.play();

        let id = PlaybackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.playbacks.lock().insert(
            id,
            AudioPlayback {
                id,
                resource: ResourceGuard::new(Arc::clone(resource)),
                sound,
                playing: true,
                paused: false,
                looping,
                volume,
            },
        );

        tracing::debug!("Playing '{}' as {}", resource.path(), id);
        id
    }

    /// Run `f` on a playback, or warn if it does not exist.
    fn with_playback(&self, id: PlaybackId, op: &str, f: impl FnOnce(&mut AudioPlayback)) -> bool {
        let mut playbacks = self.playbacks.lock();
        match playbacks.get_mut(&id) {
            Some(playback) => {
                f(playback);
                true
            }
            None => {
                tracing::warn!("Cannot {} {}: no such playback", op, id);
                false
            }
        }
    }

    /// Stop a playback. It is dropped on the next [`update`](Self::update).
    pub fn stop_audio(&self, id: PlaybackId) -> bool {
        self.with_playback(id, "stop", |playback| {
            playback.sound.stop();
            playback.playing = false;
            playback.paused = false;
        })
    }

    pub fn pause_audio(&self, id: PlaybackId) -> bool {
        self.with_playback(id, "pause", |playback| {
            if playback.playing {
                playback.sound.pause();
                playback.playing = false;
                playback.paused = true;
            }
        })
    }

    pub fn resume_audio(&self, id: PlaybackId) -> bool {
        self.with_playback(id, "resume", |playback| {
            if playback.paused {
                playback.sound.resume();
                playback.playing = true;
                playback.paused = false;
            }
        })
    }

    /// Set the volume, clamped to `[0, 1]`.
    pub fn set_audio_volume(&self, id: PlaybackId, volume: f32) -> bool {
        let volume = clamp_volume(volume);
        self.with_playback(id, "set volume of", |playback| {
            playback.sound.set_volume(volume);
            playback.volume = volume;
        })
    }

    pub fn stop_all_audio(&self) {
        let mut playbacks = self.playbacks.lock();
        for playback in playbacks.values_mut() {
            playback.sound.stop();
            playback.playing = false;
            playback.paused = false;
        }
    }

    /// Mark finished sounds as stopped and drop every playback that is
    /// neither playing nor paused.
    pub fn update(&self, _dt: Duration) {
        let mut playbacks = self.playbacks.lock();
        for playback in playbacks.values_mut() {
            if playback.playing && playback.sound.is_finished() {
                playback.playing = false;
            }
        }

        let before = playbacks.len();
        playbacks.retain(|_, playback| playback.is_alive());
        let removed = before - playbacks.len();
        if removed > 0 {
            tracing::trace!("Released {} finished playbacks", removed);
        }
    }

    /// IDs of playbacks currently playing, ascending.
    pub fn active_playbacks(&self) -> Vec<PlaybackId> {
        let mut ids: Vec<_> = self
            .playbacks
            .lock()
            .values()
            .filter(|p| p.playing)
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_playing(&self, id: PlaybackId) -> bool {
        self.playbacks.lock().get(&id).is_some_and(|p| p.playing)
    }

    pub fn is_paused(&self, id: PlaybackId) -> bool {
        self.playbacks.lock().get(&id).is_some_and(|p| p.paused)
    }

    pub fn volume_of(&self, id: PlaybackId) -> Option<f32> {
        self.playbacks.lock().get(&id).map(|p| p.volume)
    }

    /// Number of tracked playbacks, including paused and not yet collected ones.
    pub fn playback_count(&self) -> usize {
        self.playbacks.lock().len()
    }
}

impl ResourceBackend for AudioBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    fn initialize(&self) -> AssetResult<()> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(err) = self.engine.initialize() {
            self.initialized.store(false, Ordering::Release);
            return Err(err);
        }
        tracing::debug!("Audio backend ready on engine '{}'", self.engine.name());
        Ok(())
    }

    fn shutdown(&self) {
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return;
        }
        self.stop_all_audio();
        self.playbacks.lock().clear();
        self.engine.shutdown();
        tracing::debug!("Audio backend shut down");
    }

    fn decode(&self, ctx: LoadContext<'_>) -> AssetResult<ResourceData> {
        let result = match ctx.source {
            ResourceSource::File { .. } => decode_clip(
                &ctx.display_path(),
                ctx.bytes,
                ctx.extension.unwrap_or_default(),
            )
            .map(|clip| ResourceData::Audio(Arc::new(clip))),
            _ => Err(ctx.error("audio clips must come from files")),
        };
        self.stats.record(result)
    }

    fn statistics(&self) -> String {
        format!(
            "{}, {} playbacks ({} active)",
            self.stats.summary(Self::NAME),
            self.playback_count(),
            self.active_playbacks().len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::silent_wav;
    use crate::engine::SilentAudioEngine;
    use quarry_assets::{BackendExt, FileReader, LoadConfig};

    struct Fixture {
        _dir: tempfile::TempDir,
        backend: Arc<AudioBackend>,
        reader: Arc<FileReader>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blip.wav"), silent_wav(8_000, 1, 0).unwrap()).unwrap();
        std::fs::write(dir.path().join("long.wav"), silent_wav(8_000, 1, 80_000).unwrap()).unwrap();
        let backend = Arc::new(AudioBackend::new(Arc::new(SilentAudioEngine::new())));
        backend.initialize().unwrap();
        Fixture {
            reader: Arc::new(FileReader::new(dir.path())),
            _dir: dir,
            backend,
        }
    }

    fn load(f: &Fixture, path: &str) -> Arc<Resource> {
        let dyn_backend: Arc<dyn ResourceBackend> = f.backend.clone();
        dyn_backend
            .load_sync(path, ResourceType::Audio, &LoadConfig::default(), &f.reader)
            .unwrap()
    }

    #[test]
    fn test_play_and_collect() {
        let f = fixture();
        let blip = load(&f, "blip.wav");

        let id = f.backend.play_audio(&blip, false, 2.0);
        assert!(id.is_valid());
        assert_eq!(f.backend.volume_of(id), Some(1.0));
        assert_eq!(blip.ref_count(), 1);

        // A zero-length clip ends on the first update.
        f.backend.update(Duration::from_millis(16));
        assert_eq!(f.backend.playback_count(), 0);
        assert_eq!(blip.ref_count(), 0);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let f = fixture();
        let long = load(&f, "long.wav");
        let a = f.backend.play_audio(&long, false, 1.0);
        let b = f.backend.play_audio(&long, true, 1.0);
        assert!(b > a);
        assert_eq!(f.backend.active_playbacks(), vec![a, b]);
    }

    #[test]
    fn test_pause_survives_update() {
        let f = fixture();
        let long = load(&f, "long.wav");
        let id = f.backend.play_audio(&long, false, 0.5);

        assert!(f.backend.pause_audio(id));
        assert!(f.backend.is_paused(id));
        f.backend.update(Duration::from_millis(16));
        assert_eq!(f.backend.playback_count(), 1);
        assert!(f.backend.active_playbacks().is_empty());

        assert!(f.backend.resume_audio(id));
        assert!(f.backend.is_playing(id));

        assert!(f.backend.stop_audio(id));
        f.backend.update(Duration::from_millis(16));
        assert_eq!(f.backend.playback_count(), 0);
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let f = fixture();
        assert!(!f.backend.stop_audio(PlaybackId::INVALID));
        assert!(!f.backend.pause_audio(PlaybackId(99)));
        assert!(!f.backend.set_audio_volume(PlaybackId(99), 0.5));
    }

    #[test]
    fn test_rejects_non_audio_and_unloaded() {
        let f = fixture();
        let texture = Arc::new(Resource::generated(
            "generated://white",
            ResourceType::Texture,
            Arc::new(|| Ok(ResourceData::Bytes(Arc::from(vec![0u8; 4])))),
        ));
        texture.load_sync();
        assert_eq!(f.backend.play_audio(&texture, false, 1.0), PlaybackId::INVALID);

        let blip = load(&f, "blip.wav");
        blip.unload();
        assert_eq!(f.backend.play_audio(&blip, false, 1.0), PlaybackId::INVALID);
        assert_eq!(f.backend.playback_count(), 0);
    }

    #[test]
    fn test_shutdown_clears_playbacks() {
        let f = fixture();
        let long = load(&f, "long.wav");
        f.backend.play_audio(&long, true, 1.0);

        f.backend.shutdown();
        assert_eq!(f.backend.playback_count(), 0);
        assert_eq!(long.ref_count(), 0);
        assert!(!f.backend.is_initialized());
    }
}
