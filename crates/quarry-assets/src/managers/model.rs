use std::ops::Deref;
use std::sync::Arc;

use crate::manager::{ManagerConfig, ResourceManager};
use crate::registry::BackendRegistry;
use crate::resource::Resource;
use crate::source::PRIMITIVE_SCHEME;
use crate::types::ResourceType;

/// Resource manager for 3D models.
pub struct ModelManager {
    manager: ResourceManager,
}

impl ModelManager {
    pub fn new(registry: Arc<BackendRegistry>, config: ManagerConfig) -> Self {
        Self {
            manager: ResourceManager::new("model", registry, config),
        }
    }

    pub fn load_model(&self, path: &str) -> Option<Arc<Resource>> {
        self.manager.load_sync(path, ResourceType::Model)
    }

    pub fn load_model_async(
        &self,
        path: &str,
        callback: impl FnOnce(bool) + Send + 'static,
    ) -> Option<Arc<Resource>> {
        self.manager.load_async(path, ResourceType::Model, callback)
    }

    /// Load a built-in primitive (`triangle`, `quad`, `plane`, `cube`).
    pub fn create_primitive(&self, kind: &str) -> Option<Arc<Resource>> {
        self.load_model(&format!("{}{}", PRIMITIVE_SCHEME, kind))
    }

    pub fn manager(&self) -> &ResourceManager {
        &self.manager
    }
}

impl Deref for ModelManager {
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
    fn test_create_primitive() {
        let registry = Arc::new(BackendRegistry::new());
        register_builtin_backends(&registry);
        let models = ModelManager::new(registry, ManagerConfig::default());

        let cube = models.create_primitive("cube").unwrap();
        assert_eq!(cube.name(), "cube");
        assert_eq!(cube.model().unwrap().index_count(), 36);
        assert!(models.create_primitive("teapot").is_none());
    }
}
