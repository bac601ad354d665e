//! Resource type tags, lifecycle states and load settings.

use std::fmt;
use std::path::Path;
use std::time::Duration;

/// File extensions recognized as textures.
pub const TEXTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tga", "dds", "hdr", "ktx"];

/// File extensions recognized as shader sources.
pub const SHADER_EXTENSIONS: &[&str] = &[
    "vert", "frag", "comp", "geom", "glsl", "hlsl", "wgsl", "spv", "shader",
];

/// File extensions recognized as 3D models.
pub const MODEL_EXTENSIONS: &[&str] = &["obj", "fbx", "gltf", "glb", "dae", "3ds"];

/// File extensions recognized as audio clips.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "flac"];

/// The declared family of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Texture,
    Shader,
    Model,
    Audio,
    Font,
    Material,
    Animation,
    Scene,
    Script,
    Config,
    Data,
    Unknown,
}

impl ResourceType {
    /// Every variant, in declaration order.
    pub const ALL: [ResourceType; 12] = [
        ResourceType::Texture,
        ResourceType::Shader,
        ResourceType::Model,
        ResourceType::Audio,
        ResourceType::Font,
        ResourceType::Material,
        ResourceType::Animation,
        ResourceType::Scene,
        ResourceType::Script,
        ResourceType::Config,
        ResourceType::Data,
        ResourceType::Unknown,
    ];

    /// Human-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Texture => "Texture",
            ResourceType::Shader => "Shader",
            ResourceType::Model => "Model",
            ResourceType::Audio => "Audio",
            ResourceType::Font => "Font",
            ResourceType::Material => "Material",
            ResourceType::Animation => "Animation",
            ResourceType::Scene => "Scene",
            ResourceType::Script => "Script",
            ResourceType::Config => "Config",
            ResourceType::Data => "Data",
            ResourceType::Unknown => "Unknown",
        }
    }

    /// Detect a family from a file extension (case-insensitive, no dot).
    ///
    /// Only the four loadable families are detected; everything else is
    /// `Unknown`.
    pub fn from_extension(extension: &str) -> ResourceType {
        let ext = extension.to_ascii_lowercase();
        let ext = ext.as_str();

        if TEXTURE_EXTENSIONS.contains(&ext) {
            ResourceType::Texture
        } else if SHADER_EXTENSIONS.contains(&ext) {
            ResourceType::Shader
        } else if MODEL_EXTENSIONS.contains(&ext) {
            ResourceType::Model
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            ResourceType::Audio
        } else {
            ResourceType::Unknown
        }
    }

    /// Detect a family from a path's extension.
    pub fn detect(path: &str) -> ResourceType {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(ResourceType::from_extension)
            .unwrap_or(ResourceType::Unknown)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a resource.
///
/// `Unloaded -> Loading -> {Loaded | Failed}`, `Loaded -> Unloading -> Unloaded`
/// on unload, and `Loaded -> Loading` on reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Unloading,
    Failed,
}

impl ResourceState {
    /// Returns true if loading has completed (successfully or not).
    pub fn is_done(&self) -> bool {
        matches!(self, ResourceState::Loaded | ResourceState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceState::Unloaded => "unloaded",
            ResourceState::Loading => "loading",
            ResourceState::Loaded => "loaded",
            ResourceState::Unloading => "unloading",
            ResourceState::Failed => "failed",
        }
    }
}

/// How a load request should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Block the calling thread.
    #[default]
    Sync,
    /// Queue on the manager's worker pool.
    Async,
    /// Same scheduling as `Async`; backends may use it as a hint to stream.
    Streaming,
}

/// Queue priority for worker-pool loads. Higher priorities are dequeued first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LoadPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Whether a successfully loaded resource is kept in the manager's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    Cache,
    /// Hand the resource to the caller without caching it.
    NoCache,
}

/// Settings for a single load request.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadConfig {
    pub mode: LoadMode,
    pub priority: LoadPriority,
    pub cache_policy: CachePolicy,
    /// Validate the source (existence, size, extension) before decoding.
    pub validate_on_load: bool,
    /// Extra decode attempts after the first failure.
    pub retry_count: u32,
    /// Upper bound on the time spent retrying.
    pub timeout: Option<Duration>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            mode: LoadMode::Sync,
            priority: LoadPriority::Normal,
            cache_policy: CachePolicy::Cache,
            validate_on_load: true,
            retry_count: 0,
            timeout: None,
        }
    }
}

impl LoadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_priority(mut self, priority: LoadPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_on_load = validate;
        self
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_detection_is_case_insensitive() {
        assert_eq!(ResourceType::detect("textures/Player.PNG"), ResourceType::Texture);
        assert_eq!(ResourceType::detect("shaders/basic.frag"), ResourceType::Shader);
        assert_eq!(ResourceType::detect("models/ship.GLB"), ResourceType::Model);
        assert_eq!(ResourceType::detect("sfx/jump.Wav"), ResourceType::Audio);
    }

    #[test]
    fn test_unrecognized_extensions() {
        assert_eq!(ResourceType::detect("notes.txt"), ResourceType::Unknown);
        assert_eq!(ResourceType::detect("Makefile"), ResourceType::Unknown);
        assert_eq!(ResourceType::detect("fonts/ui.ttf"), ResourceType::Unknown);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(LoadPriority::Critical > LoadPriority::High);
        assert!(LoadPriority::High > LoadPriority::Normal);
        assert!(LoadPriority::Normal > LoadPriority::Low);
    }

    #[test]
    fn test_load_config_builder() {
        let config = LoadConfig::new()
            .with_mode(LoadMode::Async)
            .with_retries(2)
            .with_cache_policy(CachePolicy::NoCache);

        assert_eq!(config.mode, LoadMode::Async);
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.cache_policy, CachePolicy::NoCache);
        assert!(config.validate_on_load);
    }
}
