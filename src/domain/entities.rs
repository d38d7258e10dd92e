//! Domain entities: update requests

use std::fmt;

/// The two ways to patch an existing alignment.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateRequest {
    /// Attach new leaves under an existing genome; its own upstream edge is untouched.
    Node { genome: String },
    /// Split the branch `parent -> child` with a new ancestor and attach new leaves to it.
    Branch {
        parent: String,
        child: String,
        ancestor_name: String,
        /// Length parent -> new ancestor
        top_length: f64,
        /// Length new ancestor -> child, instead of the computed remainder
        forced_bottom_length: Option<f64>,
    },
}

impl UpdateRequest {
    /// Branch insertion with the ancestor name derived from the split edge
    /// when none is given.
    pub fn branch(
        parent: impl Into<String>,
        child: impl Into<String>,
        ancestor_name: Option<String>,
        top_length: f64,
        forced_bottom_length: Option<f64>,
    ) -> Self {
        let parent = parent.into();
        let child = child.into();
        let ancestor_name =
            ancestor_name.unwrap_or_else(|| default_ancestor_name(&parent, &child));
        Self::Branch {
            parent,
            child,
            ancestor_name,
            top_length,
            forced_bottom_length,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            UpdateRequest::Node { .. } => "node",
            UpdateRequest::Branch { .. } => "branch",
        }
    }
}

impl fmt::Display for UpdateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateRequest::Node { genome } => write!(f, "add to node {genome}"),
            UpdateRequest::Branch {
                parent,
                child,
                ancestor_name,
                ..
            } => write!(f, "add to branch {parent} -> {child} via {ancestor_name}"),
        }
    }
}

/// `"{child}-Patch-{parent}"`
pub fn default_ancestor_name(parent: &str, child: &str) -> String {
    format!("{child}-Patch-{parent}")
}
