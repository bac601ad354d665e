use std::ops::Deref;
use std::sync::Arc;

use crate::data::{ResourceData, ShaderData, ShaderStage};
use crate::manager::{ManagerConfig, ResourceManager};
use crate::registry::BackendRegistry;
use crate::resource::Resource;
use crate::source::GENERATED_SCHEME;
use crate::types::ResourceType;

/// Resource manager for shaders.
pub struct ShaderManager {
    manager: ResourceManager,
}

impl ShaderManager {
    pub fn new(registry: Arc<BackendRegistry>, config: ManagerConfig) -> Self {
        Self {
            manager: ResourceManager::new("shader", registry, config),
        }
    }

    pub fn load_shader(&self, path: &str) -> Option<Arc<Resource>> {
        self.manager.load_sync(path, ResourceType::Shader)
    }

    pub fn load_shader_async(
        &self,
        path: &str,
        callback: impl FnOnce(bool) + Send + 'static,
    ) -> Option<Arc<Resource>> {
        self.manager.load_async(path, ResourceType::Shader, callback)
    }

    /// Register in-memory shader source, cached as `generated://<name>`.
    pub fn create_from_source(
        &self,
        name: &str,
        stage: ShaderStage,
        source: impl Into<String>,
    ) -> Option<Arc<Resource>> {
        let source = source.into();
        if source.trim().is_empty() {
            tracing::warn!("Refusing blank shader source for '{}'", name);
            return None;
        }

        let shader = Arc::new(ShaderData {
            stage,
            source,
            binary: Vec::new(),
        });
        self.manager.insert_generated(
            &format!("{}{}", GENERATED_SCHEME, name),
            ResourceType::Shader,
            Arc::new(move || Ok(ResourceData::Shader(Arc::clone(&shader)))),
        )
    }

    pub fn manager(&self) -> &ResourceManager {
        &self.manager
    }
}

impl Deref for ShaderManager {
    type Target = ResourceManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::register_builtin_backends;

    #[test]
    fn test_create_from_source() {
        let registry = Arc::new(BackendRegistry::new());
        register_builtin_backends(&registry);
        let shaders = ShaderManager::new(registry, ManagerConfig::default());

        let res = shaders
            .create_from_source("flat", ShaderStage::Fragment, "void main() {}")
            .unwrap();
        let shader = res.shader().unwrap();
        assert_eq!(shader.stage, ShaderStage::Fragment);
        assert!(shaders.get_resource("generated://flat").is_some());

        assert!(shaders.create_from_source("blank", ShaderStage::Vertex, "  ").is_none());
    }
}
