//! Portable decision tree nodes and the serializer that produces them
//!
//! A fitted tree is read through [`TreeSource`], an array-indexed view of
//! nodes rooted at index 0, and converted into a nested [`TreeNode`].
//! Consumers route a feature value to `lhs` when `value <= threshold`.

use serde::{Deserialize, Serialize};

use crate::errors::{ForestError, Result};

/// A node of an exported tree.
///
/// Serializes as `{"fid", "threshold", "lhs", "rhs"}` for decisions and
/// `{"leaf": [...]}` for leaves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TreeNode {
    Decision {
        fid: usize,
        threshold: f64,
        lhs: Box<TreeNode>,
        rhs: Box<TreeNode>,
    },
    Leaf {
        leaf: Vec<f64>,
    },
}

/// Read-only view of a fitted, array-backed binary tree.
///
/// Implementors decide leaf vs decision through [`TreeSource::is_leaf`];
/// no sentinel value is inspected by the serializer.
pub trait TreeSource {
    /// Number of nodes in the tree
    fn node_count(&self) -> usize;

    fn is_leaf(&self, node: usize) -> bool;

    /// Split feature column; only meaningful for decision nodes
    fn feature(&self, node: usize) -> usize;

    fn threshold(&self, node: usize) -> f64;

    fn left(&self, node: usize) -> usize;

    fn right(&self, node: usize) -> usize;

    /// Per-class values stored at the node
    fn value(&self, node: usize) -> &[f64];
}

/// Convert a fitted tree into its portable nested form, starting at node 0.
pub fn serialize_tree<T: TreeSource + ?Sized>(tree: &T) -> Result<TreeNode> {
    if tree.node_count() == 0 {
        return Err(ForestError::InvalidTree("tree has no nodes".to_string()));
    }
    recurse(tree, 0, 0)
}

fn recurse<T: TreeSource + ?Sized>(tree: &T, node: usize, depth: usize) -> Result<TreeNode> {
    let count = tree.node_count();
    if node >= count {
        return Err(ForestError::InvalidTree(format!(
            "node index {} out of range ({} nodes)",
            node, count
        )));
    }
    // A valid tree can never be deeper than it has nodes.
    if depth >= count {
        return Err(ForestError::InvalidTree(format!(
            "cycle detected at node {}",
            node
        )));
    }

    if tree.is_leaf(node) {
        return Ok(TreeNode::Leaf {
            leaf: tree.value(node).to_vec(),
        });
    }

    Ok(TreeNode::Decision {
        fid: tree.feature(node),
        threshold: tree.threshold(node),
        lhs: Box::new(recurse(tree, tree.left(node), depth + 1)?),
        rhs: Box::new(recurse(tree, tree.right(node), depth + 1)?),
    })
}

impl TreeNode {
    /// Follow the `<=`-goes-left convention down to a leaf and return its values.
    ///
    /// Columns past the end of `features` read as 0.0, the same as an
    /// absent sparse feature.
    pub fn leaf_for(&self, features: &[f64]) -> &[f64] {
        let mut node = self;
        loop {
            match node {
                TreeNode::Decision {
                    fid,
                    threshold,
                    lhs,
                    rhs,
                } => {
                    let value = features.get(*fid).copied().unwrap_or(0.0);
                    node = if value <= *threshold { lhs } else { rhs };
                }
                TreeNode::Leaf { leaf } => return leaf,
            }
        }
    }

    /// Fraction of the reached leaf's mass that belongs to class 1.
    pub fn positive_fraction(&self, features: &[f64]) -> f64 {
        let leaf = self.leaf_for(features);
        let total: f64 = leaf.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        leaf.get(1).copied().unwrap_or(0.0) / total
    }

    /// Longest root-to-leaf path, counted in edges
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Decision { lhs, rhs, .. } => 1 + lhs.depth().max(rhs.depth()),
            TreeNode::Leaf { .. } => 0,
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            TreeNode::Decision { lhs, rhs, .. } => lhs.leaf_count() + rhs.leaf_count(),
            TreeNode::Leaf { .. } => 1,
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            TreeNode::Decision { lhs, rhs, .. } => 1 + lhs.node_count() + rhs.node_count(),
            TreeNode::Leaf { .. } => 1,
        }
    }

    /// Visit every leaf vector, depth first, left before right.
    pub fn for_each_leaf<F: FnMut(&[f64])>(&self, f: &mut F) {
        match self {
            TreeNode::Decision { lhs, rhs, .. } => {
                lhs.for_each_leaf(f);
                rhs.for_each_leaf(f);
            }
            TreeNode::Leaf { leaf } => f(leaf),
        }
    }

    /// Visit every decision node as `(fid, threshold)`.
    pub fn for_each_split<F: FnMut(usize, f64)>(&self, f: &mut F) {
        if let TreeNode::Decision {
            fid,
            threshold,
            lhs,
            rhs,
        } = self
        {
            f(*fid, *threshold);
            lhs.for_each_split(f);
            rhs.for_each_split(f);
        }
    }
}
