//! Getting the alignment and the work directories ready before planning.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::application::options::UpdateOptions;
use crate::application::services::HalToolchain;
use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::DomainError;
use crate::infrastructure::traits::FileSystem;

pub const BACKUP_SUFFIX: &str = ".bak";

/// What to do to the input alignment before it is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Safeguards {
    pub backup: bool,
    pub validate: bool,
}

/// Checks and prepares the input alignment and the work directories.
pub struct WorkspaceService {
    fs: Arc<dyn FileSystem>,
    toolchain: Arc<HalToolchain>,
}

impl WorkspaceService {
    pub fn new(fs: Arc<dyn FileSystem>, toolchain: Arc<HalToolchain>) -> Self {
        Self { fs, toolchain }
    }

    /// Container check, then validation and backup, then work dirs.
    ///
    /// Returns the backup path when one was written.
    pub fn prepare(
        &self,
        opts: &UpdateOptions,
        safeguards: Safeguards,
    ) -> ApplicationResult<Option<PathBuf>> {
        self.check_container(&opts.in_hal)?;

        if safeguards.validate {
            self.toolchain.validate_alignment(&opts.in_hal)?;
        }
        let backup = if safeguards.backup {
            Some(self.backup(&opts.in_hal)?)
        } else {
            None
        };

        self.create_work_dirs(opts)?;
        Ok(backup)
    }

    /// The alignment must be an existing regular file.
    pub fn check_container(&self, hal: &Path) -> ApplicationResult<()> {
        if self.fs.is_file(hal) {
            Ok(())
        } else {
            Err(DomainError::InvalidContainer(hal.display().to_string()).into())
        }
    }

    /// Copy `<hal>` to `<hal>.bak`, overwriting an older backup.
    pub fn backup(&self, hal: &Path) -> ApplicationResult<PathBuf> {
        let mut target = hal.as_os_str().to_owned();
        target.push(BACKUP_SUFFIX);
        let target = PathBuf::from(target);

        info!("backing up {} to {}", hal.display(), target.display());
        self.fs
            .copy(hal, &target)
            .with_path_context("back up alignment", hal)?;
        Ok(target)
    }

    pub fn create_work_dirs(&self, opts: &UpdateOptions) -> ApplicationResult<()> {
        for dir in [&opts.jobstore_dir, &opts.out_dir] {
            debug!("create_work_dirs: {}", dir.display());
            self.fs
                .create_dir_all(dir)
                .with_path_context("create directory", dir)?;
        }
        Ok(())
    }
}
