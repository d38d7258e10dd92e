//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of tree topology or input rules.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("genome {0:?} not found in the alignment tree")]
    NotFound(String),

    #[error("not a valid branch: genome {parent:?} (top) is not the parent of {child:?} (bottom)")]
    InvalidBranch { parent: String, child: String },

    #[error(
        "top branch length {top} exceeds the original branch length {original}; \
         this would leave a negative length ({}) below the new ancestor, \
         use --force-bottom-branch-length to set a positive length explicitly",
        .original - .top
    )]
    LengthOverflow { top: f64, original: f64 },

    #[error("invalid genome list, line {line}: {message}")]
    InputFormat { line: usize, message: String },

    #[error("unknown update action: {0:?}")]
    UnknownAction(String),

    #[error("genome {0:?} already exists in the alignment tree")]
    DuplicateGenome(String),

    #[error("invalid newick tree: {message}")]
    InvalidTree { message: String },

    #[error("invalid alignment file: {0}")]
    InvalidContainer(String),
}

impl DomainError {
    pub fn invalid_tree(message: impl Into<String>) -> Self {
        Self::InvalidTree {
            message: message.into(),
        }
    }
}
