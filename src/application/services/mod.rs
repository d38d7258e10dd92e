//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, CommandRunner)
//! but are themselves concrete structs, not traits.

pub mod toolchain;
mod update;
mod workspace;

pub use toolchain::{HalToolchain, SequenceMap};
pub use update::{UpdateService, ADD_TO_BRANCH_PROGRAM, REPLACE_PROGRAM};
pub use workspace::{Safeguards, WorkspaceService, BACKUP_SUFFIX};
