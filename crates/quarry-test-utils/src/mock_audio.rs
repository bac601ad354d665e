//! Audio engine whose sounds finish on command.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use quarry_assets::{AssetError, AssetResult, AudioClip};
use quarry_audio::{AudioEngine, Sound};

#[derive(Debug, Default)]
struct SoundState {
    playing: bool,
    paused: bool,
    looping: bool,
    finished: bool,
    volume: f32,
}

/// Shared view of a sound created by [`MockAudioEngine`].
#[derive(Debug, Clone, Default)]
pub struct MockSoundHandle {
    state: Arc<Mutex<SoundState>>,
}

impl MockSoundHandle {
    /// Make the sound report itself finished.
    pub fn finish(&self) {
        self.state.lock().finished = true;
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn is_looping(&self) -> bool {
        self.state.lock().looping
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }
}

struct MockSound {
    handle: MockSoundHandle,
}

impl Sound for MockSound {
    fn play(&mut self) {
        let mut state = self.handle.state.lock();
        state.playing = true;
        state.paused = false;
        state.finished = false;
    }

    fn pause(&mut self) {
        let mut state = self.handle.state.lock();
        state.playing = false;
        state.paused = true;
    }

    fn resume(&mut self) {
        let mut state = self.handle.state.lock();
        state.playing = true;
        state.paused = false;
    }

    fn stop(&mut self) {
        let mut state = self.handle.state.lock();
        state.playing = false;
        state.paused = false;
        state.finished = true;
    }

    fn set_looping(&mut self, looping: bool) {
        self.handle.state.lock().looping = looping;
    }

    fn set_volume(&mut self, volume: f32) {
        self.handle.state.lock().volume = volume;
    }

    fn is_finished(&self) -> bool {
        self.handle.state.lock().finished
    }
}

/// Audio engine for tests.
///
/// Every created sound is tracked; sounds never end on their own.
#[derive(Default)]
pub struct MockAudioEngine {
    sounds: Mutex<Vec<MockSoundHandle>>,
    fail_create: AtomicBool,
}

impl MockAudioEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_sound` calls fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn sound_count(&self) -> usize {
        self.sounds.lock().len()
    }

    pub fn sounds(&self) -> Vec<MockSoundHandle> {
        self.sounds.lock().clone()
    }

    pub fn finish_all(&self) {
        for sound in self.sounds.lock().iter() {
            sound.finish();
        }
    }
}

impl AudioEngine for MockAudioEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn create_sound(&self, _clip: Arc<AudioClip>) -> AssetResult<Box<dyn Sound>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AssetError::Other {
                message: "mock engine refused to create a sound".to_string(),
            });
        }
        let handle = MockSoundHandle::default();
        self.sounds.lock().push(handle.clone());
        Ok(Box::new(MockSound { handle }))
    }
}
