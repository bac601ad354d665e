//! Playback identifiers and records.

use std::fmt;

use quarry_assets::ResourceGuard;

use crate::engine::Sound;

/// Identifier of a playback. `0` is reserved as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PlaybackId(pub u64);

impl PlaybackId {
    pub const INVALID: PlaybackId = PlaybackId(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "playback#{}", self.0)
    }
}

/// One playing (or paused) sound.
///
/// The guard keeps the clip referenced, so cleanup never evicts a clip that
/// is still being played.
pub struct AudioPlayback {
    pub id: PlaybackId,
    pub resource: ResourceGuard,
    pub sound: Box<dyn Sound>,
    pub playing: bool,
    pub paused: bool,
    pub looping: bool,
    pub volume: f32,
}

impl AudioPlayback {
    /// Kept by `update` while playing or paused.
    pub fn is_alive(&self) -> bool {
        self.playing || self.paused
    }
}

impl fmt::Debug for AudioPlayback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioPlayback")
            .field("id", &self.id)
            .field("resource", &self.resource.path())
            .field("playing", &self.playing)
            .field("paused", &self.paused)
            .field("looping", &self.looping)
            .field("volume", &self.volume)
            .finish()
    }
}

/// Clamp to `[0, 1]`, mapping NaN to silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
