//! Extremely randomized trees ensemble classifier

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::cart::{FittedTree, RandomizedTreeBuilder, TreeConfig};
use crate::errors::{Result, TrainerError};

/// Per-class sample reweighting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Weight class c by `n / (n_classes * count_c)`
    Balanced,
    /// Every sample weighs 1
    Uniform,
}

/// Number of features examined per split
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
    Count(usize),
}

impl MaxFeatures {
    /// Concrete count for `n_features` columns, never below 1
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Log2 if n_features > 0 => (n_features as f64).log2() as usize,
            MaxFeatures::Log2 => 0,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(k) => (*k).min(n_features),
        };
        n.max(1)
    }
}

/// Ensemble hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraTreesParams {
    pub n_estimators: usize,
    pub seed: u64,
    pub class_weight: ClassWeight,
    pub max_features: MaxFeatures,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for ExtraTreesParams {
    fn default() -> Self {
        Self {
            n_estimators: 30,
            seed: 13,
            class_weight: ClassWeight::Balanced,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

/// Fits [`ExtraTreesModel`]s
#[derive(Clone, Debug, Default)]
pub struct ExtraTreesClassifier {
    params: ExtraTreesParams,
}

impl ExtraTreesClassifier {
    pub fn new(params: ExtraTreesParams) -> Self {
        Self { params }
    }

    /// Fit the ensemble on dense rows and binary labels.
    pub fn fit(&self, rows: &[Vec<f64>], labels: &[u8]) -> Result<ExtraTreesModel> {
        if rows.is_empty() {
            return Err(TrainerError::Training("training set is empty".to_string()));
        }
        if rows.len() != labels.len() {
            return Err(TrainerError::Training(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&y| y > 1) {
            return Err(TrainerError::Training(format!("label {} is not binary", bad)));
        }
        if self.params.n_estimators == 0 {
            return Err(TrainerError::Training("n_estimators must be at least 1".to_string()));
        }

        let n_features = rows[0].len();
        if let Some(pos) = rows.iter().position(|r| r.len() != n_features) {
            return Err(TrainerError::Training(format!(
                "row {} has {} features, expected {}",
                pos,
                rows[pos].len(),
                n_features
            )));
        }

        let weights = sample_weights(labels, self.params.class_weight);
        let tree_config = TreeConfig {
            max_features: self.params.max_features.resolve(n_features),
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
        };

        let mut master = StdRng::seed_from_u64(self.params.seed);
        let builder = RandomizedTreeBuilder::new(rows, labels, &weights, tree_config);
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for tree_idx in 0..self.params.n_estimators {
            let mut rng = StdRng::seed_from_u64(master.gen());
            let tree = builder.build(&mut rng);
            tracing::debug!(
                "Tree {}/{}: {} nodes, {} leaves",
                tree_idx + 1,
                self.params.n_estimators,
                tree.nodes.len(),
                tree.leaf_count()
            );
            trees.push(tree);
        }

        Ok(ExtraTreesModel { trees, n_features })
    }
}

/// A fitted ensemble
#[derive(Clone, Debug, PartialEq)]
pub struct ExtraTreesModel {
    trees: Vec<FittedTree>,
    n_features: usize,
}

impl ExtraTreesModel {
    pub fn trees(&self) -> &[FittedTree] {
        &self.trees
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Class-1 probability per row, averaged over trees
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(row)[1]).sum();
        sum / self.trees.len() as f64
    }
}

/// Per-sample weights for the chosen class weighting
pub fn sample_weights(labels: &[u8], class_weight: ClassWeight) -> Vec<f64> {
    match class_weight {
        ClassWeight::Uniform => vec![1.0; labels.len()],
        ClassWeight::Balanced => {
            let mut counts = [0usize; 2];
            for &y in labels {
                counts[y as usize] += 1;
            }
            let present = counts.iter().filter(|&&c| c > 0).count().max(1);
            let n = labels.len() as f64;
            let per_class: Vec<f64> = counts
                .iter()
                .map(|&c| if c == 0 { 0.0 } else { n / (present as f64 * c as f64) })
                .collect();
            labels.iter().map(|&y| per_class[y as usize]).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let x = i as f64;
            rows.push(vec![x, (i % 3) as f64, 1.0]);
            labels.push(u8::from(i >= 32));
        }
        (rows, labels)
    }

    #[test]
    fn test_balanced_weights() {
        let weights = sample_weights(&[0, 0, 0, 1], ClassWeight::Balanced);
        assert_eq!(weights, vec![4.0 / 6.0, 4.0 / 6.0, 4.0 / 6.0, 2.0]);

        let total_0: f64 = weights[..3].iter().sum();
        assert!((total_0 - weights[3]).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_weights_are_one() {
        assert_eq!(sample_weights(&[1, 1], ClassWeight::Balanced), vec![1.0, 1.0]);
        assert_eq!(sample_weights(&[0, 1], ClassWeight::Uniform), vec![1.0, 1.0]);
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(10), 3);
        assert_eq!(MaxFeatures::Sqrt.resolve(0), 1);
        assert_eq!(MaxFeatures::Log2.resolve(8), 3);
        assert_eq!(MaxFeatures::All.resolve(7), 7);
        assert_eq!(MaxFeatures::Count(50).resolve(7), 7);
    }

    #[test]
    fn test_fit_builds_requested_trees() -> Result<()> {
        let (rows, labels) = toy_data();
        let model = ExtraTreesClassifier::default().fit(&rows, &labels)?;

        assert_eq!(model.trees().len(), 30);
        assert_eq!(model.n_features(), 3);

        let proba = model.predict_proba(&rows);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        // Fully grown trees reproduce the training labels.
        for (p, &y) in proba.iter().zip(labels.iter()) {
            assert_eq!(*p, f64::from(y));
        }
        Ok(())
    }

    #[test]
    fn test_fit_is_deterministic() -> Result<()> {
        let (rows, labels) = toy_data();
        let params = ExtraTreesParams {
            n_estimators: 5,
            ..ExtraTreesParams::default()
        };
        let a = ExtraTreesClassifier::new(params.clone()).fit(&rows, &labels)?;
        let b = ExtraTreesClassifier::new(params).fit(&rows, &labels)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_fit_on_extreme_finite_values() -> Result<()> {
        let model = ExtraTreesClassifier::default().fit(&[vec![-1e308], vec![1e308]], &[0, 1])?;
        assert_eq!(model.predict_proba(&[vec![-1e308], vec![1e308]]), vec![0.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let clf = ExtraTreesClassifier::default();
        assert!(clf.fit(&[], &[]).is_err());
        assert!(clf.fit(&[vec![1.0]], &[0, 1]).is_err());
        assert!(clf.fit(&[vec![1.0]], &[2]).is_err());
        assert!(clf.fit(&[vec![1.0], vec![1.0, 2.0]], &[0, 1]).is_err());
    }
}
