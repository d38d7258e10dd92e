//! Newick parser producing a [`PhyloTree`].
//!
//! Accepts the dialect `halStats --tree` prints: nested groups, optional
//! labels (bare or single-quoted), optional `:length`, terminating `;`.

use std::collections::HashSet;

use generational_arena::Index;
use tracing::debug;

use crate::domain::arena::{NodeData, PhyloTree};
use crate::domain::error::DomainError;

/// Parse Newick text into an arena tree.
pub fn parse_newick(text: &str) -> Result<PhyloTree, DomainError> {
    let mut parser = Parser {
        chars: text.trim().chars().collect(),
        pos: 0,
        tree: PhyloTree::new(),
        seen: HashSet::new(),
    };
    if parser.chars.is_empty() {
        return Err(DomainError::invalid_tree("empty input"));
    }

    parser.subtree(None)?;
    parser.skip_whitespace();
    match parser.bump() {
        Some(';') => {}
        Some(c) => return Err(parser.error(&format!("expected ';', found {c:?}"))),
        None => return Err(DomainError::invalid_tree("missing terminating ';'")),
    }
    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        return Err(parser.error("trailing characters after ';'"));
    }

    debug!("parse_newick: {} nodes", parser.tree.len());
    Ok(parser.tree)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    tree: PhyloTree,
    seen: HashSet<String>,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> DomainError {
        DomainError::invalid_tree(format!("{message} at offset {}", self.pos))
    }

    fn subtree(&mut self, parent: Option<Index>) -> Result<Index, DomainError> {
        // Node goes in first so children keep their source order.
        let idx = self.tree.insert_node(
            NodeData {
                name: String::new(),
                weight: None,
            },
            parent,
        );

        self.skip_whitespace();
        if self.peek() == Some('(') {
            self.pos += 1;
            loop {
                self.subtree(Some(idx))?;
                self.skip_whitespace();
                match self.bump() {
                    Some(',') => continue,
                    Some(')') => break,
                    Some(c) => return Err(self.error(&format!("unexpected {c:?} in group"))),
                    None => return Err(DomainError::invalid_tree("unbalanced parentheses")),
                }
            }
        }

        self.skip_whitespace();
        let name = self.label()?;
        self.skip_whitespace();
        let weight = if self.peek() == Some(':') {
            self.pos += 1;
            Some(self.length()?)
        } else {
            None
        };

        if !name.is_empty() && !self.seen.insert(name.clone()) {
            return Err(DomainError::invalid_tree(format!("duplicate node name {name:?}")));
        }
        if let Some(node) = self.tree.get_node_mut(idx) {
            node.data = NodeData { name, weight };
        }
        Ok(idx)
    }

    fn label(&mut self) -> Result<String, DomainError> {
        if self.peek() == Some('\'') {
            self.pos += 1;
            let mut label = String::new();
            loop {
                match self.bump() {
                    // '' is an escaped quote inside a quoted label
                    Some('\'') if self.peek() == Some('\'') => {
                        self.pos += 1;
                        label.push('\'');
                    }
                    Some('\'') => return Ok(label),
                    Some(c) => label.push(c),
                    None => return Err(DomainError::invalid_tree("unterminated quoted label")),
                }
            }
        }

        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || "(),:;'".contains(c) {
                break;
            }
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn length(&mut self) -> Result<f64, DomainError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || "+-.eE".contains(c) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        raw.parse::<f64>()
            .map_err(|_| self.error(&format!("invalid branch length {raw:?}")))
    }
}
