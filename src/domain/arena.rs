//! Arena-backed phylogenetic tree.

use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

/// Payload of one genome in the alignment tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    /// Genome name, unique within a tree
    pub name: String,
    /// Length of the branch to the parent, None for the root or when omitted
    pub weight: Option<f64>,
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.weight {
            Some(w) => write!(f, "{}:{}", self.name, format_length(w)),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Tree node in the arena.
#[derive(Debug)]
pub struct TreeNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes, in source order
    pub children: Vec<Index>,
}

/// Arena-based phylogenetic tree.
///
/// Node handles (`Index`) are only meaningful for the arena that issued them;
/// two extractions of the same alignment produce unrelated handles.
#[derive(Debug)]
pub struct PhyloTree {
    arena: Arena<TreeNode>,
    root: Option<Index>,
}

impl Default for PhyloTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PhyloTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<Index>) -> Index {
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub(crate) fn get_node_mut(&mut self, idx: Index) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Breadth-first iterator starting at the root.
    pub fn iter_bfs(&self) -> BfsIterator<'_> {
        BfsIterator::new(self)
    }

    /// Render the tree for terminal display.
    pub fn to_display_tree(&self) -> termtree::Tree<String> {
        fn build(tree: &PhyloTree, idx: Index) -> termtree::Tree<String> {
            let node = &tree.arena[idx];
            let leaves: Vec<_> = node.children.iter().map(|&c| build(tree, c)).collect();
            termtree::Tree::new(node.data.to_string()).with_leaves(leaves)
        }

        match self.root {
            Some(root) => build(self, root),
            None => termtree::Tree::new("Empty tree".to_string()),
        }
    }
}

pub struct BfsIterator<'a> {
    tree: &'a PhyloTree,
    queue: std::collections::VecDeque<Index>,
}

impl<'a> BfsIterator<'a> {
    fn new(tree: &'a PhyloTree) -> Self {
        let mut queue = std::collections::VecDeque::new();
        if let Some(root) = tree.root() {
            queue.push_back(root);
        }
        Self { tree, queue }
    }
}

impl<'a> Iterator for BfsIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.queue.pop_front() {
            if let Some(node) = self.tree.get_node(current_idx) {
                self.queue.extend(node.children.iter().copied());
                return Some((current_idx, node));
            }
        }
        None
    }
}

/// Render a branch length the way Newick writers usually do: shortest
/// round-trip digits, integral values keep a trailing `.0`.
pub fn format_length(value: f64) -> String {
    format!("{:?}", value)
}
