//! Integration tests for the asset loader façade.
//!
//! A stub texture backend registered at priority 0 stands in for image
//! decoding, so plain text files named `*.png` load as textures.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use quarry::prelude::*;
use quarry_test_utils::StubBackend;

// ============================================================================
// Helper Functions
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

fn create_loader(dir: &Path, task_threads: usize, stub: &Arc<StubBackend>) -> AssetLoader {
    let loader = AssetLoader::new(
        LoaderConfig::default()
            .with_base_path(dir)
            .with_worker_threads(1)
            .with_task_threads(task_threads),
    );
    assert!(stub.register(loader.registry(), 0));
    assert!(loader.initialize());
    loader
}

fn texture_stub() -> StubBackend {
    StubBackend::new("stub-texture", &[ResourceType::Texture], &["png"])
}

fn write_files(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), format!("pixels of {}", name)).unwrap();
    }
}

/// Poll until `condition` holds or the wait limit passes.
fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_stub_backend_end_to_end() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &["tex.png"]);
    let stub = Arc::new(texture_stub());
    let loader = create_loader(temp_dir.path(), 1, &stub);

    let texture = loader.load_texture("tex.png").unwrap();
    assert_eq!(texture.resource_type(), ResourceType::Texture);
    assert!(texture.is_loaded());
    assert_eq!(loader.textures().len(), 1);

    let again = loader.load_texture("tex.png").unwrap();
    assert!(Arc::ptr_eq(&texture, &again));
    assert_eq!(loader.textures().len(), 1);
    let stats = loader.statistics();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.total_resources, 1);

    assert!(loader.unload_asset("tex.png"));
    assert_eq!(loader.textures().len(), 0);
    assert!(loader.get_asset("tex.png").is_none());
    assert!(!loader.unload_asset("tex.png"));
}

#[test]
fn test_type_detection_routes_to_managers() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &["LOGO.PNG"]);
    let wav = quarry::audio::silent_wav(8_000, 1, 800).unwrap();
    std::fs::write(temp_dir.path().join("beep.wav"), wav).unwrap();
    std::fs::write(temp_dir.path().join("basic.vert"), "void main() {}\n").unwrap();

    let stub = Arc::new(texture_stub());
    let loader = create_loader(temp_dir.path(), 1, &stub);

    assert!(loader.load_asset("LOGO.PNG").is_some());
    assert!(loader.load_asset("beep.wav").is_some());
    assert!(loader.load_asset("basic.vert").is_some());
    assert!(loader.load_asset("readme.md").is_none());

    assert!(loader.textures().contains("LOGO.PNG"));
    assert!(loader.audio().contains("beep.wav"));
    assert!(loader.shaders().contains("basic.vert"));
    assert_eq!(loader.all_assets().len(), 3);
}

// ============================================================================
// Async tasks
// ============================================================================

#[test]
fn test_async_load_completes_and_calls_back_once() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &["hero.png"]);
    let stub = Arc::new(texture_stub());
    let loader = create_loader(temp_dir.path(), 2, &stub);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let (tx, rx) = mpsc::channel();
    let id = loader.load_asset_async("hero.png", move |resource| {
        counter.fetch_add(1, Ordering::SeqCst);
        tx.send(resource.map(|r| r.is_loaded())).unwrap();
    });

    assert!(id.is_valid());
    assert!(loader.wait_for_task(id, WAIT));
    assert!(loader.is_task_completed(id));
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some(true));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(loader.active_task_count(), 0);

    // The result is reachable through the loader's shortcut cache.
    assert!(loader.get_asset("hero.png").is_some());

    assert_eq!(loader.reap_completed_tasks(), 1);
    assert!(loader.is_task_completed(id));
}

#[test]
fn test_task_ids_are_monotonic() {
    let temp_dir = tempfile::tempdir().unwrap();
    let stub = Arc::new(texture_stub());
    let loader = create_loader(temp_dir.path(), 1, &stub);

    let a = loader.load_texture_async("generated://white", |_| {});
    let b = loader.load_texture_async("generated://black", |_| {});
    let c = loader.load_model_async("primitive://cube", |_| {});
    assert!(a < b && b < c);

    for id in [a, b, c] {
        assert!(loader.wait_for_task(id, WAIT));
    }
}

#[test]
fn test_unknown_task_is_completed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let stub = Arc::new(texture_stub());
    let loader = create_loader(temp_dir.path(), 1, &stub);

    assert!(loader.is_task_completed(TaskId(4242)));
    assert!(loader.wait_for_task(TaskId(4242), Duration::ZERO));
    assert!(!loader.cancel_task(TaskId(4242)));
}

#[test]
fn test_cancel_completed_task_is_noop() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &["done.png"]);
    let stub = Arc::new(texture_stub());
    let loader = create_loader(temp_dir.path(), 1, &stub);

    let id = loader.load_texture_async("done.png", |_| {});
    assert!(loader.wait_for_task(id, WAIT));

    assert!(!loader.cancel_task(id));
    assert!(!loader.cancel_task(id));
    assert!(loader.is_task_completed(id));
    assert!(loader.textures().contains("done.png"));
}

#[test]
fn test_cancel_running_task_suppresses_callback() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &["slow.png"]);
    let stub = Arc::new(texture_stub().with_delay(Duration::from_millis(300)));
    let loader = create_loader(temp_dir.path(), 1, &stub);

    let (tx, rx) = mpsc::channel();
    let id = loader.load_texture_async("slow.png", move |r| tx.send(r.is_some()).unwrap());
    assert!(wait_until(|| stub.decode_count_for("slow.png") == 1));

    assert!(loader.cancel_task(id));
    assert!(loader.is_task_completed(id));
    assert!(!loader.cancel_task(id));

    // The load itself still finishes, unobserved.
    assert!(wait_until(|| loader.textures().get_resource("slow.png").is_some_and(|r| r.is_loaded())));
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_cancel_queued_task_never_loads() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &["first.png", "second.png"]);
    let stub = Arc::new(texture_stub().with_delay(Duration::from_millis(300)));
    let loader = create_loader(temp_dir.path(), 1, &stub);

    let (tx, rx) = mpsc::channel();
    let first_tx = tx.clone();
    let first = loader.load_texture_async("first.png", move |r| first_tx.send(r.is_some()).unwrap());
    assert!(wait_until(|| stub.decode_count_for("first.png") == 1));

    // The single task thread is busy, so this one has not started.
    let second = loader.load_texture_async("second.png", move |r| tx.send(r.is_some()).unwrap());
    assert!(loader.cancel_task(second));

    assert!(loader.wait_for_task(first, WAIT));
    assert!(rx.recv_timeout(WAIT).unwrap());
    std::thread::sleep(Duration::from_millis(50));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(stub.decode_count_for("second.png"), 0);
    assert!(!loader.textures().contains("second.png"));
}

// ============================================================================
// Batch and asset lists
// ============================================================================

#[test]
fn test_batch_keeps_positions_of_failures() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &["valid.png", "valid2.png"]);
    let stub = Arc::new(texture_stub());
    let loader = create_loader(temp_dir.path(), 1, &stub);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let (tx, rx) = mpsc::channel();
    let id = loader.load_assets_batch(&["valid.png", "missing.png", "valid2.png"], move |assets| {
        counter.fetch_add(1, Ordering::SeqCst);
        tx.send(assets).unwrap();
    });

    assert!(loader.wait_for_task(id, WAIT));
    let assets = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(assets.len(), 3);
    assert_eq!(assets[0].as_ref().map(|r| r.path()), Some("valid.png"));
    assert!(assets[1].is_none());
    assert_eq!(assets[2].as_ref().map(|r| r.path()), Some("valid2.png"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_load_from_asset_list() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &["a.png", "b.png"]);
    std::fs::write(
        temp_dir.path().join("startup.txt"),
        "# startup assets\n\n  a.png  \n# b is optional\nb.png\nmissing.png\n",
    )
    .unwrap();
    let stub = Arc::new(texture_stub());
    let loader = create_loader(temp_dir.path(), 1, &stub);

    let (tx, rx) = mpsc::channel();
    let id = loader.load_assets_from_config("startup.txt", move |assets| tx.send(assets).unwrap());
    assert!(loader.wait_for_task(id, WAIT));

    let assets = rx.recv_timeout(WAIT).unwrap();
    let loaded: Vec<bool> = assets.iter().map(Option::is_some).collect();
    assert_eq!(loaded, vec![true, true, false]);
}

#[test]
fn test_missing_asset_list_yields_empty_result() {
    let temp_dir = tempfile::tempdir().unwrap();
    let stub = Arc::new(texture_stub());
    let loader = create_loader(temp_dir.path(), 1, &stub);

    let (tx, rx) = mpsc::channel();
    loader.load_assets_from_config("nowhere.txt", move |assets| tx.send(assets.len()).unwrap());
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 0);
}

// ============================================================================
// Maintenance
// ============================================================================

#[test]
fn test_cleanup_and_unload_all() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &["kept.png", "loose.png"]);
    let stub = Arc::new(texture_stub());
    let loader = create_loader(temp_dir.path(), 1, &stub);

    let kept = loader.load_asset("kept.png").unwrap();
    loader.load_asset("loose.png").unwrap();
    let _guard = ResourceGuard::new(Arc::clone(&kept));

    assert_eq!(loader.cleanup_unused_assets(), 1);
    assert!(loader.get_asset("loose.png").is_none());
    assert!(loader.get_asset("kept.png").is_some());

    loader.unload_all_assets();
    assert!(loader.all_assets().is_empty());
    assert_eq!(kept.state(), ResourceState::Unloaded);
}

#[test]
fn test_shutdown_answers_nothing_after_cancel() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &["late.png"]);
    let stub = Arc::new(texture_stub().with_delay(Duration::from_millis(50)));
    let loader = create_loader(temp_dir.path(), 1, &stub);

    let (tx, rx) = mpsc::channel();
    let id = loader.load_texture_async("late.png", move |r| tx.send(r.is_some()).unwrap());
    loader.shutdown();

    assert!(loader.is_task_completed(id));
    assert_eq!(loader.tracked_task_count(), 0);
    assert!(loader.all_assets().is_empty());
    assert!(rx.try_recv().is_err());
}
