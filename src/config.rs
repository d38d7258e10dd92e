//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/halpatch/halpatch.toml`
//! 3. Local config: `<project_dir>/.halpatch.toml`
//! 4. Environment variables: `HALPATCH_*` prefix
//!
//! Command-line flags are applied on top by the CLI layer.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Planner options used when nothing else is configured.
pub const DEFAULT_PREPARE_OPTIONS: &str =
    "--preprocessBatchSize 1 --cactusOptions '--realTimeLogging --logInfo --retryCount 0'";

/// Unified configuration for halpatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Options appended to every hal tool command
    pub hal_options: String,
    /// Where extracted sequences, seq files and intermediate alignments go
    pub out_dir: PathBuf,
    /// Base directory of job stores used in the plan
    pub jobstore_dir: PathBuf,
    /// Extra options passed to cactus-prepare
    pub prepare_options: String,
    /// Do not copy the alignment to `<file>.bak`
    pub skip_backup: bool,
    /// Do not run halValidate on the alignment before reading it
    pub skip_validate: bool,
    /// Append a diff of the regenerated root ancestor sequence
    pub fasta_check: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hal_options: "--hdf5InMemory".into(),
            out_dir: PathBuf::from("./steps"),
            jobstore_dir: PathBuf::from("./jobstore"),
            prepare_options: DEFAULT_PREPARE_OPTIONS.into(),
            skip_backup: false,
            skip_validate: false,
            fasta_check: false,
        }
    }
}

/// Raw settings for intermediate parsing (every field optional to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub hal_options: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub jobstore_dir: Option<PathBuf>,
    pub prepare_options: Option<String>,
    pub skip_backup: Option<bool>,
    pub skip_validate: Option<bool>,
    pub fasta_check: Option<bool>,
}

/// Get the XDG config directory for halpatch.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "halpatch").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("halpatch.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".halpatch.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input as is.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            hal_options: overlay
                .hal_options
                .clone()
                .unwrap_or_else(|| self.hal_options.clone()),
            out_dir: overlay
                .out_dir
                .clone()
                .unwrap_or_else(|| self.out_dir.clone()),
            jobstore_dir: overlay
                .jobstore_dir
                .clone()
                .unwrap_or_else(|| self.jobstore_dir.clone()),
            prepare_options: overlay
                .prepare_options
                .clone()
                .unwrap_or_else(|| self.prepare_options.clone()),
            skip_backup: overlay.skip_backup.unwrap_or(self.skip_backup),
            skip_validate: overlay.skip_validate.unwrap_or(self.skip_validate),
            fasta_check: overlay.fasta_check.unwrap_or(self.fasta_check),
        }
    }

    /// Expand shell variables and tilde in path fields.
    fn expand_paths(&mut self) {
        self.out_dir = PathBuf::from(expand_env_vars(&self.out_dir.to_string_lossy()));
        self.jobstore_dir = PathBuf::from(expand_env_vars(&self.jobstore_dir.to_string_lossy()));
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional directory holding a local `.halpatch.toml`
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = project_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply HALPATCH_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("HALPATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("hal_options") {
            settings.hal_options = val;
        }
        if let Ok(val) = config.get_string("out_dir") {
            settings.out_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("jobstore_dir") {
            settings.jobstore_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("prepare_options") {
            settings.prepare_options = val;
        }
        if let Ok(val) = config.get_bool("skip_backup") {
            settings.skip_backup = val;
        }
        if let Ok(val) = config.get_bool("skip_validate") {
            settings.skip_validate = val;
        }
        if let Ok(val) = config.get_bool("fasta_check") {
            settings.fasta_check = val;
        }

        Ok(settings)
    }

    /// Render as TOML for `config show`.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize settings: {e}"),
        })
    }
}
