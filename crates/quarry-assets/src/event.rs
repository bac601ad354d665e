//! Resource events for change detection.

use crate::types::ResourceType;

/// Events emitted by a resource manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEvent {
    /// A resource finished its first load.
    Loaded {
        id: u64,
        path: String,
        resource_type: ResourceType,
    },

    /// A cached resource was loaded again.
    Reloaded {
        id: u64,
        path: String,
        resource_type: ResourceType,
    },

    /// A resource was explicitly unloaded and removed from the cache.
    Unloaded { id: u64, path: String },

    /// A load failed.
    LoadFailed {
        path: String,
        resource_type: ResourceType,
        error: String,
    },

    /// An unreferenced resource was evicted by cleanup.
    Evicted { id: u64, path: String },
}

impl ResourceEvent {
    /// The path this event relates to.
    pub fn path(&self) -> &str {
        match self {
            ResourceEvent::Loaded { path, .. }
            | ResourceEvent::Reloaded { path, .. }
            | ResourceEvent::Unloaded { path, .. }
            | ResourceEvent::LoadFailed { path, .. }
            | ResourceEvent::Evicted { path, .. } => path,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ResourceEvent::Loaded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ResourceEvent::LoadFailed { .. })
    }

    /// Check if the resource left the cache.
    pub fn is_removed(&self) -> bool {
        matches!(
            self,
            ResourceEvent::Unloaded { .. } | ResourceEvent::Evicted { .. }
        )
    }
}

/// A buffer of resource events that can be drained each frame.
#[derive(Debug, Default)]
pub struct ResourceEventBuffer {
    events: Vec<ResourceEvent>,
}

impl ResourceEventBuffer {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: ResourceEvent) {
        self.events.push(event);
    }

    /// Take all buffered events, oldest first.
    pub fn take(&mut self) -> Vec<ResourceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_empties_buffer() {
        let mut buffer = ResourceEventBuffer::new();
        buffer.push(ResourceEvent::Loaded {
            id: 1,
            path: "a.png".to_string(),
            resource_type: ResourceType::Texture,
        });
        buffer.push(ResourceEvent::Evicted {
            id: 1,
            path: "a.png".to_string(),
        });
        assert_eq!(buffer.len(), 2);

        let events = buffer.take();
        assert!(buffer.is_empty());
        assert!(events[0].is_loaded());
        assert!(events[1].is_removed());
        assert_eq!(events[1].path(), "a.png");
    }
}
