//! Domain layer: tree surgery, patches and plan structure
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod assembly;
pub mod branch_length;
pub mod entities;
pub mod error;
pub mod locator;
pub mod newick;
pub mod patch;
pub mod plan;

pub use arena::{format_length, NodeData, PhyloTree, TreeNode};
pub use assembly::{Assembly, AssemblyMap};
pub use branch_length::{resolve, ResolvedLengths};
pub use entities::*;
pub use error::DomainError;
pub use newick::parse_newick;
pub use patch::build_patch;
pub use plan::{ExecutionPlan, Invocation, Phase, PlanLine, PlanSection};
