//! Randomized classification tree builder
//!
//! Grows one extremely randomized tree: at each node a random subset of
//! non-constant features is tried, each with a single threshold drawn
//! uniformly between the node's min and max, and the candidate with the
//! largest weighted Gini decrease wins. Samples go left when
//! `value <= threshold`.

use poetry_forest_core::{TreeSource, N_CLASSES};
use rand::Rng;

/// Growth limits for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// Non-constant features examined per node, at least 1
    pub max_features: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_features: 1,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

/// A node of a fitted tree.
///
/// `feature` is `None` for leaves; that is the only leaf discriminant.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub feature: Option<usize>,
    pub threshold: f64,
    pub left: usize,
    pub right: usize,
    /// Weighted class totals of the training samples reaching this node
    pub value: [f64; N_CLASSES],
}

/// Array-backed fitted tree; node 0 is the root
#[derive(Clone, Debug, PartialEq)]
pub struct FittedTree {
    pub nodes: Vec<Node>,
}

impl FittedTree {
    /// Index of the leaf a row lands in
    pub fn apply(&self, row: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            match node.feature {
                None => return idx,
                Some(f) => {
                    let value = row.get(f).copied().unwrap_or(0.0);
                    idx = if value <= node.threshold { node.left } else { node.right };
                }
            }
        }
    }

    /// Normalized class distribution of the leaf a row lands in
    pub fn predict_proba(&self, row: &[f64]) -> [f64; N_CLASSES] {
        let value = self.nodes[self.apply(row)].value;
        let total: f64 = value.iter().sum();
        if total <= 0.0 {
            return [0.0; N_CLASSES];
        }
        let mut proba = value;
        for p in &mut proba {
            *p /= total;
        }
        proba
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.feature.is_none()).count()
    }
}

impl TreeSource for FittedTree {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn is_leaf(&self, node: usize) -> bool {
        self.nodes[node].feature.is_none()
    }

    fn feature(&self, node: usize) -> usize {
        self.nodes[node].feature.unwrap_or(0)
    }

    fn threshold(&self, node: usize) -> f64 {
        self.nodes[node].threshold
    }

    fn left(&self, node: usize) -> usize {
        self.nodes[node].left
    }

    fn right(&self, node: usize) -> usize {
        self.nodes[node].right
    }

    fn value(&self, node: usize) -> &[f64] {
        &self.nodes[node].value
    }
}

/// Best split found at a node
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    improvement: f64,
}

/// Grows one randomized tree over borrowed training data
pub struct RandomizedTreeBuilder<'a> {
    config: TreeConfig,
    rows: &'a [Vec<f64>],
    labels: &'a [u8],
    weights: &'a [f64],
    feature_count: usize,
}

impl<'a> RandomizedTreeBuilder<'a> {
    pub fn new(rows: &'a [Vec<f64>], labels: &'a [u8], weights: &'a [f64], config: TreeConfig) -> Self {
        assert_eq!(rows.len(), labels.len());
        assert_eq!(rows.len(), weights.len());

        let feature_count = rows.first().map(Vec::len).unwrap_or(0);

        Self {
            config,
            rows,
            labels,
            weights,
            feature_count,
        }
    }

    /// Build the tree; all randomness comes from `rng`.
    pub fn build<R: Rng>(&self, rng: &mut R) -> FittedTree {
        let mut nodes = Vec::new();
        let indices: Vec<usize> = (0..self.rows.len()).collect();

        self.build_node(&indices, 0, &mut nodes, rng);

        FittedTree { nodes }
    }

    fn build_node<R: Rng>(&self, indices: &[usize], depth: usize, nodes: &mut Vec<Node>, rng: &mut R) -> usize {
        let current_idx = nodes.len();
        let value = self.class_totals(indices);

        let pure = value.iter().filter(|&&w| w > 0.0).count() <= 1;
        let too_deep = self.config.max_depth.is_some_and(|max| depth >= max);

        let split = if pure || too_deep || indices.len() < self.config.min_samples_split {
            None
        } else {
            self.find_random_split(indices, &value, rng)
        };

        let Some(split) = split else {
            nodes.push(Node {
                feature: None,
                threshold: 0.0,
                left: 0,
                right: 0,
                value,
            });
            return current_idx;
        };

        let (left_indices, right_indices) = self.split_samples(indices, split.feature_idx, split.threshold);

        // Reserve space for current node
        nodes.push(Node {
            feature: Some(split.feature_idx),
            threshold: split.threshold,
            left: 0,
            right: 0,
            value,
        });

        let left_idx = self.build_node(&left_indices, depth + 1, nodes, rng);
        let right_idx = self.build_node(&right_indices, depth + 1, nodes, rng);

        nodes[current_idx].left = left_idx;
        nodes[current_idx].right = right_idx;

        current_idx
    }

    /// Draw features until `max_features` non-constant ones have been tried.
    fn find_random_split<R: Rng>(&self, indices: &[usize], parent: &[f64; N_CLASSES], rng: &mut R) -> Option<SplitCandidate> {
        let mut candidates: Vec<usize> = (0..self.feature_count).collect();
        let mut visited = 0usize;
        let mut best: Option<SplitCandidate> = None;
        let parent_impurity = gini(parent);

        while visited < self.config.max_features && !candidates.is_empty() {
            let pick = rng.gen_range(0..candidates.len());
            let feature_idx = candidates.swap_remove(pick);

            let (min, max) = self.feature_range(indices, feature_idx);
            if max <= min {
                continue;
            }
            visited += 1;

            // Interpolate instead of `gen_range`: `max - min` may overflow.
            let u: f64 = rng.gen();
            let mut threshold = min * (1.0 - u) + max * u;
            if !(min..max).contains(&threshold) {
                threshold = min;
            }

            let improvement = self.impurity_decrease(indices, feature_idx, threshold, parent, parent_impurity);
            if best.as_ref().map_or(true, |b| improvement > b.improvement) {
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold,
                    improvement,
                });
            }
        }

        best
    }

    fn feature_range(&self, indices: &[usize], feature_idx: usize) -> (f64, f64) {
        indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            let v = self.rows[i][feature_idx];
            (lo.min(v), hi.max(v))
        })
    }

    fn split_samples(&self, indices: &[usize], feature_idx: usize, threshold: f64) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .copied()
            .partition(|&idx| self.rows[idx][feature_idx] <= threshold)
    }

    /// Weighted Gini decrease of splitting `indices` at `threshold`
    fn impurity_decrease(
        &self,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
        parent: &[f64; N_CLASSES],
        parent_impurity: f64,
    ) -> f64 {
        let mut left = [0.0; N_CLASSES];
        for &idx in indices {
            if self.rows[idx][feature_idx] <= threshold {
                left[self.labels[idx] as usize] += self.weights[idx];
            }
        }
        let mut right = *parent;
        for (r, l) in right.iter_mut().zip(left.iter()) {
            *r -= l;
        }

        let w_parent: f64 = parent.iter().sum();
        let w_left: f64 = left.iter().sum();
        let w_right: f64 = right.iter().sum();
        if w_parent <= 0.0 {
            return 0.0;
        }

        parent_impurity - (w_left / w_parent) * gini(&left) - (w_right / w_parent) * gini(&right)
    }

    fn class_totals(&self, indices: &[usize]) -> [f64; N_CLASSES] {
        let mut totals = [0.0; N_CLASSES];
        for &idx in indices {
            totals[self.labels[idx] as usize] += self.weights[idx];
        }
        totals
    }
}

/// Gini impurity of weighted class totals
fn gini(totals: &[f64; N_CLASSES]) -> f64 {
    let sum: f64 = totals.iter().sum();
    if sum <= 0.0 {
        return 0.0;
    }
    1.0 - totals.iter().map(|&w| (w / sum) * (w / sum)).sum::<f64>()
}
