//! Registry of named backend factories.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{BackendCapabilities, ResourceBackend};
use crate::error::AssetResult;
use crate::types::ResourceType;

/// Builds (or hands out) a backend instance.
pub type BackendFactory = Arc<dyn Fn() -> AssetResult<Arc<dyn ResourceBackend>> + Send + Sync>;

/// Default priority for backends. Lower values are tried first.
pub const DEFAULT_BACKEND_PRIORITY: i32 = 100;

/// Entry in the registry.
#[derive(Clone)]
pub struct BackendInfo {
    pub name: String,
    pub priority: i32,
    pub capabilities: BackendCapabilities,
    factory: BackendFactory,
    /// Registration order, used to break priority ties.
    sequence: u64,
}

#[derive(Default)]
struct RegistryTable {
    /// Sorted by (priority, sequence).
    entries: Vec<BackendInfo>,
    next_sequence: u64,
}

impl RegistryTable {
    fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| a.priority.cmp(&b.priority).then(a.sequence.cmp(&b.sequence)));
    }
}

/// Table of backend factories, selected by resource type and file format.
///
/// Queries read the capabilities captured at registration and never
/// instantiate a backend. Share it as `Arc<BackendRegistry>`.
#[derive(Default)]
pub struct BackendRegistry {
    table: Mutex<RegistryTable>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend factory. Returns `false` if `name` is taken.
    pub fn register_backend(
        &self,
        name: impl Into<String>,
        capabilities: BackendCapabilities,
        priority: i32,
        factory: impl Fn() -> AssetResult<Arc<dyn ResourceBackend>> + Send + Sync + 'static,
    ) -> bool {
        let name = name.into();
        let mut table = self.table.lock();

        if table.entries.iter().any(|e| e.name == name) {
            tracing::warn!("Backend '{}' is already registered", name);
            return false;
        }

        let sequence = table.next_sequence;
        table.next_sequence += 1;
        table.entries.push(BackendInfo {
            name: name.clone(),
            priority,
            capabilities,
            factory: Arc::new(factory),
            sequence,
        });
        table.sort();

        tracing::debug!("Registered backend '{}' (priority {})", name, priority);
        true
    }

    /// Remove a backend. Returns `false` if it was not registered.
    pub fn unregister_backend(&self, name: &str) -> bool {
        let mut table = self.table.lock();
        let before = table.entries.len();
        table.entries.retain(|e| e.name != name);

        let removed = table.entries.len() != before;
        if removed {
            table.sort();
            tracing::debug!("Unregistered backend '{}'", name);
        }
        removed
    }

    /// Instantiate a backend through its factory.
    ///
    /// Factory errors and panics are logged and reported as `None`.
    pub fn create_backend(&self, name: &str) -> Option<Arc<dyn ResourceBackend>> {
        // The factory runs outside the lock so it may query the registry.
        let factory = {
            let table = self.table.lock();
            table
                .entries
                .iter()
                .find(|e| e.name == name)
                .map(|e| Arc::clone(&e.factory))
        };

        let Some(factory) = factory else {
            tracing::warn!("No backend named '{}'", name);
            return None;
        };

        match catch_unwind(AssertUnwindSafe(|| factory())) {
            Ok(Ok(backend)) => Some(backend),
            Ok(Err(err)) => {
                tracing::error!("Backend factory '{}' failed: {}", name, err);
                None
            }
            Err(_) => {
                tracing::error!("Backend factory '{}' panicked", name);
                None
            }
        }
    }

    /// Names of backends supporting `resource_type`, in selection order.
    pub fn backends_for_resource_type(&self, resource_type: ResourceType) -> Vec<String> {
        self.table
            .lock()
            .entries
            .iter()
            .filter(|e| e.capabilities.supports_type(resource_type))
            .map(|e| e.name.clone())
            .collect()
    }

    /// Names of backends supporting `extension`, in selection order.
    pub fn backends_for_file_format(&self, extension: &str) -> Vec<String> {
        self.table
            .lock()
            .entries
            .iter()
            .filter(|e| e.capabilities.supports_format(extension))
            .map(|e| e.name.clone())
            .collect()
    }

    /// Names of backends supporting both `resource_type` and `extension`.
    pub fn backends_for(&self, resource_type: ResourceType, extension: &str) -> Vec<String> {
        self.table
            .lock()
            .entries
            .iter()
            .filter(|e| {
                e.capabilities.supports_type(resource_type)
                    && e.capabilities.supports_format(extension)
            })
            .map(|e| e.name.clone())
            .collect()
    }

    /// Snapshot of a registry entry.
    pub fn backend_info(&self, name: &str) -> Option<BackendInfo> {
        self.table
            .lock()
            .entries
            .iter()
            .find(|e| e.name == name)
            .cloned()
    }

    pub fn capabilities_of(&self, name: &str) -> Option<BackendCapabilities> {
        self.backend_info(name).map(|info| info.capabilities)
    }

    pub fn priority_of(&self, name: &str) -> Option<i32> {
        self.table
            .lock()
            .entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.priority)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.lock().entries.iter().any(|e| e.name == name)
    }

    /// All registered names, in selection order.
    pub fn backend_names(&self) -> Vec<String> {
        self.table
            .lock()
            .entries
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut table = self.table.lock();
        table.entries.clear();
        table.next_sequence = 0;
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.backend_names())
            .finish()
    }
}
