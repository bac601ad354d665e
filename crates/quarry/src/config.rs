//! Asset loader configuration.

use std::path::Path;
use std::time::Duration;

use quarry_assets::{LoadConfig, ManagerConfig};

use crate::task_pool::default_thread_count;

/// How long `cancel_task` waits for an in-flight task before detaching it.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_millis(100);

/// How long `shutdown` waits for each outstanding task.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Settings for an [`AssetLoader`](crate::AssetLoader).
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Threads in the background task pool. `None` uses `max(1, cores - 1)`.
    pub task_threads: Option<usize>,
    pub cancel_grace: Duration,
    pub shutdown_grace: Duration,
    /// Applied to every typed manager.
    pub manager: ManagerConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            task_threads: None,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            manager: ManagerConfig::default(),
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task_threads(mut self, threads: usize) -> Self {
        self.task_threads = Some(threads);
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_manager_config(mut self, manager: ManagerConfig) -> Self {
        self.manager = manager;
        self
    }

    /// Root directory for relative asset and manifest paths.
    pub fn with_base_path(mut self, base_path: impl AsRef<Path>) -> Self {
        self.manager = self.manager.with_base_path(base_path);
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.manager = self.manager.with_worker_threads(threads);
        self
    }

    pub fn with_default_load_config(mut self, config: LoadConfig) -> Self {
        self.manager = self.manager.with_default_load_config(config);
        self
    }

    pub fn resolved_task_threads(&self) -> usize {
        self.task_threads
            .filter(|&threads| threads > 0)
            .unwrap_or_else(default_thread_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.cancel_grace, Duration::from_millis(100));
        assert_eq!(config.shutdown_grace, Duration::from_millis(100));
        assert!(config.resolved_task_threads() >= 1);
    }

    #[test]
    fn test_builder() {
        let config = LoaderConfig::new()
            .with_task_threads(3)
            .with_base_path("assets")
            .with_cancel_grace(Duration::ZERO);

        assert_eq!(config.resolved_task_threads(), 3);
        assert_eq!(config.manager.base_path, Path::new("assets"));
        assert_eq!(config.cancel_grace, Duration::ZERO);
        assert!(LoaderConfig::new().with_task_threads(0).resolved_task_threads() >= 1);
    }
}
