//! Decision tree structure and evaluation.

use serde::{Deserialize, Serialize};

use crate::error::ArtifactLoadError;

/// Tolerance for a leaf distribution summing to one.
const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Deepest tree accepted from an artifact, counted in edges from the root.
///
/// Trees are owned recursively, so unbounded depth would exhaust the stack
/// when a tree is rebuilt or dropped.
pub const MAX_TREE_DEPTH: usize = 1024;

/// Class probability pair stored at a leaf: `[P(label 0), P(label 1)]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassDistribution([f64; 2]);

impl ClassDistribution {
    /// Create a distribution from the two class probabilities.
    #[must_use]
    pub fn new(negative: f64, positive: f64) -> Self {
        Self([negative, positive])
    }

    /// Probability of label 0.
    #[must_use]
    pub fn negative(&self) -> f64 {
        self.0[0]
    }

    /// Probability of label 1.
    #[must_use]
    pub fn positive(&self) -> f64 {
        self.0[1]
    }

    fn check(&self) -> Result<(), String> {
        if self.0.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(format!("leaf distribution {:?} has a negative or non-finite entry", self.0));
        }
        let sum = self.0[0] + self.0[1];
        if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(format!("leaf distribution sums to {sum}, expected 1"));
        }
        Ok(())
    }
}

/// A node of a decision tree. Each split exclusively owns both children.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// Interior split: features `<= threshold` go left.
    Split {
        /// Zero-based feature index compared at this node.
        feature: usize,
        /// Split threshold.
        threshold: f64,
        /// Subtree for `vector[feature] <= threshold`.
        left: Box<TreeNode>,
        /// Subtree for `vector[feature] > threshold`.
        right: Box<TreeNode>,
    },
    /// Terminal node.
    Leaf {
        /// Class probabilities learned for this leaf.
        distribution: ClassDistribution,
    },
}

impl TreeNode {
    /// Convenience constructor for a split node.
    #[must_use]
    pub fn split(feature: usize, threshold: f64, left: TreeNode, right: TreeNode) -> Self {
        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Convenience constructor for a leaf node.
    #[must_use]
    pub fn leaf(negative: f64, positive: f64) -> Self {
        TreeNode::Leaf {
            distribution: ClassDistribution::new(negative, positive),
        }
    }
}

/// A single rooted binary decision tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    root: TreeNode,
}

impl DecisionTree {
    /// Wrap a root node.
    #[must_use]
    pub fn new(root: TreeNode) -> Self {
        Self { root }
    }

    /// Walk from the root to a leaf and return its distribution.
    ///
    /// `features` should hold finite values; non-finite input is rejected
    /// before a vector reaches here.
    ///
    /// # Panics
    ///
    /// Panics if a split on the path reads an index past `features.len()`.
    #[must_use]
    pub fn evaluate(&self, features: &[f64]) -> &ClassDistribution {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
                TreeNode::Leaf { distribution } => return distribution,
            }
        }
    }

    /// Root node of the tree.
    #[must_use]
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += 1;
            if let TreeNode::Split { left, right, .. } = node {
                stack.push(right);
                stack.push(left);
            }
        }
        count
    }

    /// Length of the longest root-to-leaf path, counted in edges.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(&self.root, 0)];
        while let Some((node, depth)) = stack.pop() {
            match node {
                TreeNode::Split { left, right, .. } => {
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
                TreeNode::Leaf { .. } => deepest = deepest.max(depth),
            }
        }
        deepest
    }

    /// Largest feature index any split reads.
    pub(crate) fn max_feature(&self) -> Option<usize> {
        let mut max = None;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if let TreeNode::Split {
                feature, left, right, ..
            } = node
            {
                max = max.max(Some(*feature));
                stack.push(right);
                stack.push(left);
            }
        }
        max
    }

    /// Rebuild a tree from its flattened node list.
    ///
    /// Node 0 is the root. The list must describe exactly one rooted binary
    /// tree no deeper than [`MAX_TREE_DEPTH`]: every other node is referenced
    /// by exactly one split, the root by none, and nothing is left
    /// unreachable.
    pub(crate) fn from_nodes(
        tree: usize,
        nodes: &[NodeRecord],
        n_features: usize,
    ) -> Result<Self, ArtifactLoadError> {
        let invalid = |node: usize, reason: String| ArtifactLoadError::InvalidNode { tree, node, reason };

        if nodes.is_empty() {
            return Err(invalid(0, "tree has no nodes".to_string()));
        }

        let mut parents = vec![0usize; nodes.len()];
        for (index, node) in nodes.iter().enumerate() {
            match node {
                NodeRecord::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(invalid(
                            index,
                            format!("feature index {feature} out of range for {n_features} features"),
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(index, format!("non-finite threshold {threshold}")));
                    }
                    for child in [*left, *right] {
                        if child >= nodes.len() {
                            return Err(invalid(
                                index,
                                format!("child {child} out of range for {} nodes", nodes.len()),
                            ));
                        }
                        parents[child] += 1;
                    }
                }
                NodeRecord::Leaf { distribution } => {
                    distribution.check().map_err(|reason| invalid(index, reason))?;
                }
            }
        }

        if parents[0] != 0 {
            return Err(invalid(0, "root is referenced as a child".to_string()));
        }
        if let Some(shared) = parents.iter().skip(1).position(|&p| p != 1) {
            let index = shared + 1;
            return Err(invalid(
                index,
                format!("node has {} parents, expected exactly one", parents[index]),
            ));
        }

        // With one parent per node and a parentless root, any cycle is
        // disconnected from the root and shows up as unvisited nodes.
        let mut visited = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            if depth > MAX_TREE_DEPTH {
                return Err(invalid(
                    index,
                    format!("tree is deeper than the maximum of {MAX_TREE_DEPTH} levels"),
                ));
            }
            visited += 1;
            if let NodeRecord::Split { left, right, .. } = &nodes[index] {
                stack.push((*right, depth + 1));
                stack.push((*left, depth + 1));
            }
        }
        if visited != nodes.len() {
            return Err(invalid(
                0,
                format!("{} of {} nodes are unreachable from the root", nodes.len() - visited, nodes.len()),
            ));
        }

        Ok(Self {
            root: build(nodes, 0),
        })
    }

    /// Flatten the tree into a pre-order node list rooted at index 0.
    #[must_use]
    pub(crate) fn to_nodes(&self) -> Vec<NodeRecord> {
        let mut nodes: Vec<NodeRecord> = Vec::new();
        // (node, parent position, whether it is the parent's left child)
        let mut stack: Vec<(&TreeNode, Option<(usize, bool)>)> = vec![(&self.root, None)];

        while let Some((node, parent)) = stack.pop() {
            let index = nodes.len();
            if let Some((parent, is_left)) = parent {
                if let NodeRecord::Split { left, right, .. } = &mut nodes[parent] {
                    if is_left {
                        *left = index;
                    } else {
                        *right = index;
                    }
                }
            }

            match node {
                TreeNode::Leaf { distribution } => nodes.push(NodeRecord::Leaf {
                    distribution: *distribution,
                }),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    nodes.push(NodeRecord::Split {
                        feature: *feature,
                        threshold: *threshold,
                        left: 0,
                        right: 0,
                    });
                    stack.push((right, Some((index, false))));
                    stack.push((left, Some((index, true))));
                }
            }
        }
        nodes
    }
}

/// Recursive rebuild; only called on node lists whose depth has been
/// bounded by [`MAX_TREE_DEPTH`].
fn build(nodes: &[NodeRecord], index: usize) -> TreeNode {
    match &nodes[index] {
        NodeRecord::Leaf { distribution } => TreeNode::Leaf {
            distribution: *distribution,
        },
        NodeRecord::Split {
            feature,
            threshold,
            left,
            right,
        } => TreeNode::split(*feature, *threshold, build(nodes, *left), build(nodes, *right)),
    }
}

/// Persisted form of a tree node; children are positions in the node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeRecord {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: ClassDistribution,
    },
}
