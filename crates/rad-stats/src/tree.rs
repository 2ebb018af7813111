//! Phylogenetic trees with branch lengths, keyed to matrix columns.

use std::collections::HashMap;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use rad_core::errors::RadError;
use rad_core::serde::read_json_file;

/// One node of a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TreeNode {
    /// Optional label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Length of the branch leading to this node.
    #[serde(default)]
    pub length: f64,
    /// Matrix column of the species at a tip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_index: Option<usize>,
    /// Child nodes; empty for tips.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Rooted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhyloTree {
    /// Root node.
    pub root: TreeNode,
}

struct FlatNode {
    parent: Option<usize>,
    depth: f64,
}

impl PhyloTree {
    /// Loads a tree from JSON.
    pub fn read(path: &Path) -> Result<Self, RadError> {
        read_json_file(path)
    }

    /// Patristic distances between the first `species` matrix columns.
    ///
    /// Columns without a tip in the tree get NaN rows and columns.
    pub fn distance_matrix(&self, species: usize) -> Array2<f64> {
        let mut flat: Vec<FlatNode> = Vec::new();
        let mut tips: HashMap<usize, usize> = HashMap::new();
        let mut stack: Vec<(&TreeNode, Option<usize>, f64)> = vec![(&self.root, None, 0.0)];
        while let Some((node, parent, parent_depth)) = stack.pop() {
            let depth = parent_depth + node.length;
            let idx = flat.len();
            flat.push(FlatNode { parent, depth });
            if let Some(column) = node.matrix_index {
                if column < species {
                    tips.insert(column, idx);
                }
            }
            for child in &node.children {
                stack.push((child, Some(idx), depth));
            }
        }

        let ancestors = |mut idx: usize| {
            let mut path = vec![idx];
            while let Some(parent) = flat[idx].parent {
                path.push(parent);
                idx = parent;
            }
            path
        };

        let mut distances = Array2::from_elem((species, species), f64::NAN);
        for (&a, &node_a) in &tips {
            distances[[a, a]] = 0.0;
            let path_a = ancestors(node_a);
            for (&b, &node_b) in &tips {
                if b <= a {
                    continue;
                }
                let mut cursor = Some(node_b);
                while let Some(idx) = cursor {
                    if path_a.contains(&idx) {
                        break;
                    }
                    cursor = flat[idx].parent;
                }
                if let Some(lca) = cursor {
                    let d = flat[node_a].depth + flat[node_b].depth - 2.0 * flat[lca].depth;
                    distances[[a, b]] = d;
                    distances[[b, a]] = d;
                }
            }
        }
        distances
    }
}
