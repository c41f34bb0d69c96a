//! Forest export: the single persisted training artifact
//!
//! Holds the vectorizer's column names (index = column) and one list of
//! tree roots per cross-validation fold, in fold iteration order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::{ForestError, Result};
use crate::serialization::canonical_json_bytes;
use crate::tree::TreeNode;

/// Number of classes every exported leaf carries (not poetry, poetry)
pub const N_CLASSES: usize = 2;

/// Portable forest: feature names plus per-fold ensembles of tree roots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestExport {
    pub feature_names: Vec<String>,
    pub forest: Vec<Vec<TreeNode>>,
}

impl ForestExport {
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            forest: Vec::new(),
        }
    }

    /// Append one fold's ensemble
    pub fn push_ensemble(&mut self, trees: Vec<TreeNode>) {
        self.forest.push(trees);
    }

    pub fn ensemble_count(&self) -> usize {
        self.forest.len()
    }

    /// Total trees across all ensembles
    pub fn tree_count(&self) -> usize {
        self.forest.iter().map(Vec::len).sum()
    }

    /// Check the artifact is self-consistent before it is written.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for name in &self.feature_names {
            if !seen.insert(name.as_str()) {
                return Err(ForestError::Validation(format!(
                    "duplicate feature name '{}'",
                    name
                )));
            }
        }

        let n_features = self.feature_names.len();
        for (e, ensemble) in self.forest.iter().enumerate() {
            for (t, tree) in ensemble.iter().enumerate() {
                let mut problem: Option<String> = None;

                tree.for_each_split(&mut |fid, threshold| {
                    if problem.is_some() {
                        return;
                    }
                    if fid >= n_features {
                        problem = Some(format!(
                            "feature index {} out of range ({} features)",
                            fid, n_features
                        ));
                    } else if !threshold.is_finite() {
                        problem = Some(format!("non-finite threshold on feature {}", fid));
                    }
                });

                tree.for_each_leaf(&mut |leaf| {
                    if problem.is_some() {
                        return;
                    }
                    if leaf.len() != N_CLASSES {
                        problem = Some(format!(
                            "leaf has {} entries, expected {}",
                            leaf.len(),
                            N_CLASSES
                        ));
                    } else if leaf.iter().any(|v| !v.is_finite()) {
                        problem = Some("leaf has non-finite entries".to_string());
                    }
                });

                if let Some(msg) = problem {
                    return Err(ForestError::Validation(format!(
                        "ensemble {} tree {}: {}",
                        e, t, msg
                    )));
                }
            }
        }

        Ok(())
    }

    /// Lay out named feature values in this forest's column order.
    ///
    /// Names the forest does not know are ignored; unseen columns stay 0.0.
    pub fn align_features(&self, features: &BTreeMap<String, f64>) -> Vec<f64> {
        let mut row = vec![0.0; self.feature_names.len()];
        for (i, name) in self.feature_names.iter().enumerate() {
            if let Some(value) = features.get(name) {
                row[i] = *value;
            }
        }
        row
    }

    /// Mean class-1 fraction over every tree of every ensemble.
    pub fn score(&self, row: &[f64]) -> f64 {
        let mut sum = 0.0;
        let mut total = 0usize;
        for ensemble in &self.forest {
            for tree in ensemble {
                sum += tree.positive_fraction(row);
                total += 1;
            }
        }
        if total == 0 {
            return 0.0;
        }
        sum / total as f64
    }

    /// Compact canonical JSON bytes of the artifact
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(canonical_json_bytes(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the artifact atomically and return the BLAKE3 digest of its bytes.
    ///
    /// Bytes go to a temporary file next to `path` which is then renamed
    /// over it, so an interrupted run leaves any previous file untouched.
    pub fn write_to_path(&self, path: &Path) -> Result<String> {
        let bytes = self.to_canonical_bytes()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        debug!("Staged {} bytes at {}", bytes.len(), tmp.path().display());

        tmp.persist(path)
            .map_err(|err| ForestError::Persist(format!("{}: {}", path.display(), err)))?;

        let digest = hex::encode(blake3::hash(&bytes).as_bytes());
        info!(
            "Wrote forest to {} ({} ensembles, {} trees, {} bytes)",
            path.display(),
            self.ensemble_count(),
            self.tree_count(),
            bytes.len()
        );
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(fid: usize, threshold: f64) -> TreeNode {
        TreeNode::Decision {
            fid,
            threshold,
            lhs: Box::new(TreeNode::Leaf { leaf: vec![2.0, 0.0] }),
            rhs: Box::new(TreeNode::Leaf { leaf: vec![0.0, 2.0] }),
        }
    }

    fn sample_forest() -> ForestExport {
        let mut forest = ForestExport::new(vec!["avg_line_len".into(), "has_indent".into()]);
        forest.push_ensemble(vec![stump(0, 10.0), stump(1, 0.5)]);
        forest.push_ensemble(vec![stump(0, 20.0)]);
        forest
    }

    #[test]
    fn counts() {
        let forest = sample_forest();
        assert_eq!(forest.ensemble_count(), 2);
        assert_eq!(forest.tree_count(), 3);
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_feature() {
        let mut forest = sample_forest();
        forest.push_ensemble(vec![stump(5, 1.0)]);
        let err = forest.validate().unwrap_err();
        assert!(err.to_string().contains("ensemble 2 tree 0"));
    }

    #[test]
    fn rejects_wrong_leaf_width() {
        let mut forest = sample_forest();
        forest.push_ensemble(vec![TreeNode::Leaf { leaf: vec![1.0] }]);
        assert!(matches!(forest.validate(), Err(ForestError::Validation(_))));
    }

    #[test]
    fn rejects_duplicate_names() {
        let forest = ForestExport::new(vec!["a".into(), "a".into()]);
        assert!(forest.validate().is_err());
    }

    #[test]
    fn aligns_by_name() {
        let forest = sample_forest();
        let mut features = BTreeMap::new();
        features.insert("has_indent".to_string(), 1.0);
        features.insert("unknown".to_string(), 7.0);
        assert_eq!(forest.align_features(&features), vec![0.0, 1.0]);
    }

    #[test]
    fn score_averages_all_trees() {
        let forest = sample_forest();
        // Trees: x0 <= 10 (left), x1 <= 0.5 (right), x0 <= 20 (left)
        let score = forest.score(&[5.0, 1.0]);
        assert!((score - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn json_has_expected_top_level_keys() {
        let bytes = sample_forest().to_canonical_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(r#"{"feature_names":["avg_line_len","has_indent"],"forest":[[{"fid":0"#));
        let back = ForestExport::from_json_str(&text).unwrap();
        assert_eq!(back, sample_forest());
    }
}
