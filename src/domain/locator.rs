//! Name, parent and children queries over a [`PhyloTree`].

use generational_arena::Index;
use tracing::instrument;

use crate::domain::arena::{PhyloTree, TreeNode};
use crate::domain::error::DomainError;

/// Breadth-first search for the first node with exactly this name.
#[instrument(level = "debug", skip(tree))]
pub fn find_by_name(tree: &PhyloTree, name: &str) -> Result<Index, DomainError> {
    tree.iter_bfs()
        .find(|(_, node)| node.data.name == name)
        .map(|(idx, _)| idx)
        .ok_or_else(|| DomainError::NotFound(name.to_string()))
}

/// Children of `node` with the length of the branch leading to each, in source order.
pub fn children(tree: &PhyloTree, node: Index) -> Vec<(Index, Option<f64>)> {
    tree.get_node(node)
        .map(|n| {
            n.children
                .iter()
                .filter_map(|&c| tree.get_node(c).map(|child| (c, child.data.weight)))
                .collect()
        })
        .unwrap_or_default()
}

pub fn parent(tree: &PhyloTree, node: Index) -> Option<Index> {
    tree.get_node(node).and_then(|n| n.parent)
}

pub fn name(tree: &PhyloTree, node: Index) -> &str {
    tree.get_node(node).map(|n| n.data.name.as_str()).unwrap_or("")
}

pub fn weight(tree: &PhyloTree, node: Index) -> Option<f64> {
    tree.get_node(node).and_then(|n| n.data.weight)
}

/// Check that `child` hangs directly below `parent`, in both directions.
#[instrument(level = "debug", skip(tree))]
pub fn validate_branch(tree: &PhyloTree, parent: Index, child: Index) -> Result<(), DomainError> {
    let listed = tree
        .get_node(parent)
        .is_some_and(|p: &TreeNode| p.children.contains(&child));
    let linked = self::parent(tree, child) == Some(parent);

    if listed && linked {
        Ok(())
    } else {
        Err(DomainError::InvalidBranch {
            parent: name(tree, parent).to_string(),
            child: name(tree, child).to_string(),
        })
    }
}

/// Length of the edge `parent -> child` after validating the pair.
pub fn edge_length(tree: &PhyloTree, parent: Index, child: Index) -> Result<f64, DomainError> {
    validate_branch(tree, parent, child)?;
    weight(tree, child).ok_or_else(|| {
        DomainError::invalid_tree(format!(
            "branch {} -> {} has no length",
            name(tree, parent),
            name(tree, child)
        ))
    })
}

/// Children as `(name, length)` pairs; a missing length is an error since
/// every edge ends up in a patch.
pub fn named_children(tree: &PhyloTree, node: Index) -> Result<Vec<(String, f64)>, DomainError> {
    children(tree, node)
        .into_iter()
        .map(|(idx, w)| {
            let child_name = name(tree, idx).to_string();
            w.map(|w| (child_name.clone(), w)).ok_or_else(|| {
                DomainError::invalid_tree(format!(
                    "branch {} -> {} has no length",
                    name(tree, node),
                    child_name
                ))
            })
        })
        .collect()
}

/// True if any node of the tree carries this name.
pub fn contains(tree: &PhyloTree, name: &str) -> bool {
    tree.iter_bfs().any(|(_, node)| node.data.name == name)
}
