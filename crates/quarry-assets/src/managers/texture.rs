use std::ops::Deref;
use std::sync::Arc;

use crate::data::{ResourceData, TextureData};
use crate::manager::{ManagerConfig, ResourceManager};
use crate::registry::BackendRegistry;
use crate::resource::Resource;
use crate::source::GENERATED_SCHEME;
use crate::types::ResourceType;

/// Resource manager for textures.
pub struct TextureManager {
    manager: ResourceManager,
}

impl TextureManager {
    pub fn new(registry: Arc<BackendRegistry>, config: ManagerConfig) -> Self {
        Self {
            manager: ResourceManager::new("texture", registry, config),
        }
    }

    pub fn load_texture(&self, path: &str) -> Option<Arc<Resource>> {
        self.manager.load_sync(path, ResourceType::Texture)
    }

    pub fn load_texture_async(
        &self,
        path: &str,
        callback: impl FnOnce(bool) + Send + 'static,
    ) -> Option<Arc<Resource>> {
        self.manager.load_async(path, ResourceType::Texture, callback)
    }

    /// Create a texture from raw RGBA8 pixels, cached as `generated://<name>`.
    ///
    /// Returns `None` if `pixels` is not `width * height * 4` bytes long.
    pub fn create_texture(
        &self,
        name: &str,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Option<Arc<Resource>> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            tracing::warn!(
                "Texture '{}' has {} bytes of pixels, expected {}",
                name,
                pixels.len(),
                expected
            );
            return None;
        }

        let texture = Arc::new(TextureData {
            width,
            height,
            pixels,
        });
        self.manager.insert_generated(
            &format!("{}{}", GENERATED_SCHEME, name),
            ResourceType::Texture,
            Arc::new(move || Ok(ResourceData::Texture(Arc::clone(&texture)))),
        )
    }

    /// Create a 1x1 texture of a single color.
    pub fn create_solid_color(&self, name: &str, rgba: [u8; 4]) -> Option<Arc<Resource>> {
        self.create_texture(name, 1, 1, rgba.to_vec())
    }

    /// The built-in white texture.
    pub fn default_texture(&self) -> Option<Arc<Resource>> {
        self.load_texture("generated://white")
    }

    pub fn manager(&self) -> &ResourceManager {
        &self.manager
    }
}

impl Deref for TextureManager {
    type Target = ResourceManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}
