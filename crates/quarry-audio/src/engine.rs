//! Audio engine abstraction.
//!
//! The backend never talks to a device directly. An [`AudioEngine`] turns a
//! decoded clip into a [`Sound`] it can start, pause and query.

use std::sync::Arc;
use std::time::{Duration, Instant};

use quarry_assets::{AssetResult, AudioClip};

/// A native sound instance created by an engine.
pub trait Sound: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    fn set_looping(&mut self, looping: bool);
    /// `volume` is already clamped to `[0, 1]`.
    fn set_volume(&mut self, volume: f32);
    /// Returns true once a non-looping sound reached the end of its stream.
    fn is_finished(&self) -> bool;
}

/// Creates sounds for decoded clips.
pub trait AudioEngine: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn initialize(&self) -> AssetResult<()> {
        Ok(())
    }

    fn shutdown(&self) {}

    fn create_sound(&self, clip: Arc<AudioClip>) -> AssetResult<Box<dyn Sound>>;
}

/// Engine without an output device.
///
/// Sounds track wall-clock play time and finish when it exceeds the clip
/// duration. Clips of unknown duration play until stopped.
#[derive(Debug, Default)]
pub struct SilentAudioEngine;

impl SilentAudioEngine {
    pub fn new() -> Self {
        Self
    }
}

impl AudioEngine for SilentAudioEngine {
    fn name(&self) -> &str {
        "silent"
    }

    fn create_sound(&self, clip: Arc<AudioClip>) -> AssetResult<Box<dyn Sound>> {
        Ok(Box::new(SilentSound::new(clip.duration)))
    }
}

/// Sound created by [`SilentAudioEngine`].
#[derive(Debug)]
pub struct SilentSound {
    duration: Option<Duration>,
    /// Start of the current uninterrupted play span.
    resumed_at: Option<Instant>,
    /// Play time accumulated before the current span.
    played: Duration,
    looping: bool,
    volume: f32,
    stopped: bool,
}

impl SilentSound {
    pub fn new(duration: Option<Duration>) -> Self {
        Self {
            duration,
            resumed_at: None,
            played: Duration::ZERO,
            looping: false,
            volume: 1.0,
            stopped: false,
        }
    }

    /// Total time spent playing.
    pub fn position(&self) -> Duration {
        self.played + self.resumed_at.map(|at| at.elapsed()).unwrap_or_default()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl Sound for SilentSound {
    fn play(&mut self) {
        self.played = Duration::ZERO;
        self.resumed_at = Some(Instant::now());
        self.stopped = false;
    }

    fn pause(&mut self) {
        if let Some(at) = self.resumed_at.take() {
            self.played += at.elapsed();
        }
    }

    fn resume(&mut self) {
        if self.resumed_at.is_none() && !self.stopped {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        self.pause();
        self.stopped = true;
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn is_finished(&self) -> bool {
        if self.stopped {
            return true;
        }
        match self.duration {
            Some(duration) if !self.looping => self.position() >= duration,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_clip_finishes_immediately() {
        let mut sound = SilentSound::new(Some(Duration::ZERO));
        sound.play();
        assert!(sound.is_finished());
    }

    #[test]
    fn test_looping_and_unknown_duration_never_finish() {
        let mut looping = SilentSound::new(Some(Duration::ZERO));
        looping.set_looping(true);
        looping.play();
        assert!(!looping.is_finished());

        let mut endless = SilentSound::new(None);
        endless.play();
        assert!(!endless.is_finished());
        endless.stop();
        assert!(endless.is_finished());
    }

    #[test]
    fn test_pause_freezes_position() {
        let mut sound = SilentSound::new(Some(Duration::from_secs(60)));
        sound.play();
        sound.pause();
        let frozen = sound.position();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(sound.position(), frozen);

        sound.resume();
        std::thread::sleep(Duration::from_millis(5));
        assert!(sound.position() > frozen);
    }
}
