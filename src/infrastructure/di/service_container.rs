//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{HalToolchain, UpdateService, WorkspaceService};
use crate::config::Settings;
use crate::infrastructure::traits::{CommandRunner, FileSystem, RealCommandRunner, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub toolchain: Arc<HalToolchain>,
    pub workspace: WorkspaceService,
    pub update: UpdateService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(RealCommandRunner),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
    ) -> Self {
        let settings = Arc::new(settings);
        let toolchain = Arc::new(HalToolchain::new(fs.clone(), cmd));
        let workspace = WorkspaceService::new(fs.clone(), toolchain.clone());
        let update = UpdateService::new(toolchain.clone());

        Self {
            settings,
            fs,
            toolchain,
            workspace,
            update,
        }
    }
}
