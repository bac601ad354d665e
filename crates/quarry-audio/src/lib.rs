//! Quarry Audio - audio clip loading and playback on top of `quarry-assets`.
//!
//! [`AudioManager`] loads clips through the shared backend registry and
//! drives an [`AudioBackend`], which tracks playbacks and talks to an abstract
//! [`AudioEngine`]. [`SilentAudioEngine`] is a device-free engine that ends
//! sounds by wall-clock time.
//!
//! ```ignore
//! let audio = AudioManager::new(registry, ManagerConfig::default(), Arc::new(SilentAudioEngine::new()));
//! audio.initialize();
//!
//! let id = audio.play("sfx/jump.wav", false, 0.8);
//! // once per frame
//! audio.update(dt);
//! ```

pub mod backend;
pub mod decoder;
pub mod engine;
pub mod manager;
pub mod playback;

pub use backend::AudioBackend;
pub use decoder::{AUDIO_FORMATS, decode_clip, silent_wav};
pub use engine::{AudioEngine, SilentAudioEngine, SilentSound, Sound};
pub use manager::AudioManager;
pub use playback::{AudioPlayback, PlaybackId, clamp_volume};
