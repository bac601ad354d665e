//! Quarry Assets - typed resource loading, caching and backend plugins.
//!
//! The pieces, leaf to root:
//!
//! - [`Resource`]: a typed, stateful, reference-counted unit of loaded data
//! - [`ResourceBackend`]: a pluggable decoder for one or more resource families
//! - [`BackendRegistry`]: named backend factories, selected by type and extension
//! - [`ResourceManager`]: the path-keyed cache plus a worker pool for async loads
//! - [`TextureManager`], [`ShaderManager`], [`ModelManager`]: typed front-ends
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quarry_assets::*;
//!
//! let registry = Arc::new(BackendRegistry::new());
//! register_builtin_backends(&registry);
//!
//! let textures = TextureManager::new(registry, ManagerConfig::default().with_base_path("assets"));
//! textures.initialize();
//!
//! let player = textures.load_texture("sprites/player.png");
//! let white = textures.default_texture();
//! ```

pub mod backend;
pub mod backends;
pub mod data;
pub mod error;
pub mod event;
pub mod io;
pub mod manager;
pub mod managers;
mod queue;
pub mod registry;
pub mod resource;
pub mod source;
pub mod statistics;
pub mod types;

pub use backend::{
    BackendCapabilities, BackendExt, BackendStats, LoadContext, ResourceBackend, prepare_resource,
};
pub use backends::{ModelBackend, ShaderBackend, TextureBackend, register_builtin_backends};
pub use data::{AudioClip, MeshData, ModelData, ResourceData, ShaderData, ShaderStage, TextureData};
pub use error::{AssetError, AssetResult};
pub use event::{ResourceEvent, ResourceEventBuffer};
pub use io::FileReader;
pub use manager::{ManagerConfig, ResourceManager};
pub use managers::{ModelManager, ShaderManager, TextureManager};
pub use registry::{BackendFactory, BackendInfo, BackendRegistry, DEFAULT_BACKEND_PRIORITY};
pub use resource::{LoadCallback, PayloadProvider, Resource, ResourceGenerator, ResourceGuard};
pub use source::{GENERATED_SCHEME, PRIMITIVE_SCHEME, ResourceSource};
pub use statistics::ResourceStatistics;
pub use types::{
    AUDIO_EXTENSIONS, CachePolicy, LoadConfig, LoadMode, LoadPriority, MODEL_EXTENSIONS,
    ResourceState, ResourceType, SHADER_EXTENSIONS, TEXTURE_EXTENSIONS,
};
