//! Integration tests for audio loading and playback control.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use quarry_assets::{BackendRegistry, ManagerConfig, ResourceType};
use quarry_audio::*;
use quarry_test_utils::MockAudioEngine;

fn create_manager(dir: &std::path::Path) -> (AudioManager, Arc<MockAudioEngine>) {
    let engine = Arc::new(MockAudioEngine::new());
    let manager = AudioManager::new(
        Arc::new(BackendRegistry::new()),
        ManagerConfig::default()
            .with_base_path(dir)
            .with_worker_threads(2),
        Arc::clone(&engine) as Arc<dyn AudioEngine>,
    );
    assert!(manager.initialize());
    (manager, engine)
}

fn write_wav(dir: &std::path::Path, name: &str) {
    let bytes = silent_wav(22_050, 1, 2_205).unwrap();
    std::fs::write(dir.join(name), bytes).unwrap();
}

#[test]
fn test_load_wav_clip() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_wav(temp_dir.path(), "click.wav");
    let (manager, _engine) = create_manager(temp_dir.path());

    let clip = manager.load_audio("click.wav").unwrap();
    let audio = clip.audio().unwrap();
    assert_eq!(audio.sample_rate, Some(22_050));
    assert_eq!(audio.channels, Some(1));
    assert_eq!(audio.duration, Some(Duration::from_millis(100)));
}

#[test]
fn test_play_stop_and_collect() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_wav(temp_dir.path(), "music.wav");
    let (manager, engine) = create_manager(temp_dir.path());

    let id = manager.play("music.wav", true, 0.5);
    assert!(id.is_valid());
    assert_eq!(manager.active_playbacks(), vec![id]);

    let sound = &engine.sounds()[0];
    assert!(sound.is_playing());
    assert!(sound.is_looping());
    assert_eq!(sound.volume(), 0.5);

    // Playing keeps the clip referenced.
    let clip = manager.get_resource("music.wav").unwrap();
    assert_eq!(clip.ref_count(), 1);
    assert_eq!(manager.cleanup_unused_resources(), 0);

    assert!(manager.stop_audio(id));
    assert!(manager.active_playbacks().is_empty());
    manager.update(Duration::from_millis(16));
    assert_eq!(manager.backend().playback_count(), 0);
    assert_eq!(clip.ref_count(), 0);
    assert_eq!(manager.cleanup_unused_resources(), 1);
}

#[test]
fn test_finished_sounds_are_released() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_wav(temp_dir.path(), "step.wav");
    let (manager, engine) = create_manager(temp_dir.path());

    let first = manager.play("step.wav", false, 1.0);
    let second = manager.play("step.wav", false, 1.0);
    assert!(second > first);
    assert_eq!(engine.sound_count(), 2);

    manager.update(Duration::from_millis(16));
    assert_eq!(manager.active_playbacks(), vec![first, second]);

    engine.finish_all();
    manager.update(Duration::from_millis(16));
    assert!(manager.active_playbacks().is_empty());
    assert_eq!(manager.backend().playback_count(), 0);
}

#[test]
fn test_paused_playback_survives_update() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_wav(temp_dir.path(), "ambience.wav");
    let (manager, engine) = create_manager(temp_dir.path());

    let id = manager.play("ambience.wav", true, 1.0);
    assert!(manager.pause_audio(id));
    assert!(engine.sounds()[0].is_paused());

    manager.update(Duration::from_millis(16));
    assert!(manager.backend().is_paused(id));
    assert!(manager.active_playbacks().is_empty());

    assert!(manager.resume_audio(id));
    assert_eq!(manager.active_playbacks(), vec![id]);
}

#[test]
fn test_invalid_requests() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(temp_dir.path().join("corrupt.wav"), b"RIFF0000WAVEjunk").unwrap();
    let (manager, engine) = create_manager(temp_dir.path());

    assert_eq!(manager.play("missing.wav", false, 1.0), PlaybackId::INVALID);
    assert_eq!(manager.play("corrupt.wav", false, 1.0), PlaybackId::INVALID);
    assert_eq!(engine.sound_count(), 0);

    assert!(!manager.stop_audio(PlaybackId::INVALID));
    assert!(!manager.pause_audio(PlaybackId(99)));
    assert!(!manager.resume_audio(PlaybackId(99)));
    assert!(!manager.set_audio_volume(PlaybackId(99), 0.3));
}

#[test]
fn test_engine_refusal_returns_invalid() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_wav(temp_dir.path(), "hit.wav");
    let (manager, engine) = create_manager(temp_dir.path());

    engine.set_fail_create(true);
    assert_eq!(manager.play("hit.wav", false, 1.0), PlaybackId::INVALID);
    assert_eq!(manager.backend().playback_count(), 0);

    engine.set_fail_create(false);
    assert!(manager.play("hit.wav", false, 1.0).is_valid());
}

#[test]
fn test_volume_is_clamped() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_wav(temp_dir.path(), "loud.wav");
    let (manager, engine) = create_manager(temp_dir.path());

    let id = manager.play("loud.wav", false, 3.0);
    assert_eq!(manager.backend().volume_of(id), Some(1.0));

    assert!(manager.set_audio_volume(id, -1.0));
    assert_eq!(manager.backend().volume_of(id), Some(0.0));
    assert_eq!(engine.sounds()[0].volume(), 0.0);
}

#[test]
fn test_async_audio_load() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_wav(temp_dir.path(), "late.wav");
    let (manager, _engine) = create_manager(temp_dir.path());

    let (tx, rx) = mpsc::channel();
    let handle = manager
        .load_audio_async("late.wav", move |ok| tx.send(ok).unwrap())
        .unwrap();
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    assert_eq!(handle.resource_type(), ResourceType::Audio);

    assert!(manager.play_audio(&handle, false, 1.0).is_valid());
}

#[test]
fn test_shared_registry_and_drop() {
    let temp_dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(BackendRegistry::new());

    {
        let manager = AudioManager::new(
            Arc::clone(&registry),
            ManagerConfig::default().with_base_path(temp_dir.path()),
            Arc::new(SilentAudioEngine::new()),
        );
        assert!(registry.contains(AudioBackend::NAME));
        assert_eq!(registry.backends_for(ResourceType::Audio, "ogg"), vec!["audio"]);
        drop(manager);
    }

    assert!(!registry.contains(AudioBackend::NAME));
}

#[test]
fn test_shutdown_stops_everything() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_wav(temp_dir.path(), "theme.wav");
    let (manager, engine) = create_manager(temp_dir.path());

    manager.play("theme.wav", true, 1.0);
    manager.play("theme.wav", true, 1.0);
    manager.shutdown();

    assert_eq!(manager.backend().playback_count(), 0);
    assert!(manager.is_empty());
    assert!(engine.sounds().iter().all(|s| !s.is_playing()));
}
