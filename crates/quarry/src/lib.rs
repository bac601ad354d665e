//! Quarry - asset loading for applications
//!
//! Quarry loads, caches and evicts typed runtime resources (textures,
//! shaders, models and audio clips) for a larger application:
//!
//! - **Asset Loader**: type detection, fan-out to typed managers, tracked async tasks
//! - **Resource Managers**: path-keyed caches with worker pools (`quarry-assets`)
//! - **Backends**: pluggable decoders selected through a shared registry
//! - **Audio**: clip decoding and playback control (`quarry-audio`)
//!
//! # Quick Start
//!
//! ```ignore
//! use quarry::prelude::*;
//!
//! fn main() {
//!     quarry::core::logging::init();
//!
//!     let loader = AssetLoader::new(LoaderConfig::default().with_base_path("assets"));
//!     loader.initialize();
//!
//!     let task = loader.load_assets_from_config("startup.txt", |assets| {
//!         let ready = assets.iter().filter(|a| a.is_some()).count();
//!         tracing::info!("{} of {} startup assets ready", ready, assets.len());
//!     });
//!     loader.wait_for_task(task, Duration::from_secs(10));
//!
//!     let click = loader.audio().play("sounds/click.wav", false, 0.8);
//!     loader.update(Duration::from_millis(16));
//!     println!("{}", loader.statistics());
//! }
//! ```
//!
//! # Async tasks
//!
//! Every `*_async` call returns a [`TaskId`]. Tasks can be polled with
//! [`AssetLoader::is_task_completed`], waited on with
//! [`AssetLoader::wait_for_task`] and cancelled with
//! [`AssetLoader::cancel_task`]. Cancellation never interrupts a running
//! load; it only suppresses the callback.

pub mod config;
pub mod loader;
pub mod manifest;
pub mod task;
pub mod task_pool;

// Re-export sub-crates
pub use quarry_assets as assets;
pub use quarry_audio as audio;
pub use quarry_core as core;

pub use config::{DEFAULT_CANCEL_GRACE, DEFAULT_SHUTDOWN_GRACE, LoaderConfig};
pub use loader::AssetLoader;
pub use manifest::parse_asset_list;
pub use task::{TaskId, TaskInfo, TaskKind};
pub use task_pool::TaskPool;

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;
    pub use std::time::Duration;

    pub use crate::config::LoaderConfig;
    pub use crate::loader::AssetLoader;
    pub use crate::task::TaskId;
    pub use crate::task_pool::TaskPool;

    // Asset types
    pub use quarry_assets::{
        BackendCapabilities, BackendRegistry, LoadConfig, LoadContext, ManagerConfig, Resource,
        ResourceBackend, ResourceData, ResourceGuard, ResourceState, ResourceStatistics,
        ResourceType,
    };

    // Audio types
    pub use quarry_audio::{AudioEngine, AudioManager, PlaybackId, SilentAudioEngine};
}
