//! Sparse feature mappings to a dense, fixed-column matrix
//!
//! Numbers and booleans keep their key as the column name; strings expand
//! one-hot into `key=value` columns. Columns are sorted by name so the
//! layout depends only on the input data.

use std::collections::{BTreeMap, BTreeSet};

use crate::dataset::{FeatureMap, FeatureValue};
use crate::errors::{Result, TrainerError};

/// Default separator between a categorical key and its value
pub const DEFAULT_SEPARATOR: &str = "=";

/// Dense feature rows, one per page
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureMatrix {
    pub rows: Vec<Vec<f64>>,
    pub n_features: usize,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy out the given rows in order
    pub fn select(&self, indices: &[usize]) -> Vec<Vec<f64>> {
        indices.iter().map(|&i| self.rows[i].clone()).collect()
    }
}

/// Column names and their indices, fixed after fitting
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vocabulary {
    names: Vec<String>,
    index: BTreeMap<String, usize>,
}

impl Vocabulary {
    fn from_sorted(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Column names; position is the column index
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Dictionary-style vectorizer
#[derive(Clone, Debug)]
pub struct FeatureVectorizer {
    separator: String,
}

impl Default for FeatureVectorizer {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl FeatureVectorizer {
    pub fn new(separator: &str) -> Self {
        Self {
            separator: separator.to_string(),
        }
    }

    /// Discover the vocabulary from `data` and encode it in one pass.
    pub fn fit_transform(&self, data: &[FeatureMap]) -> Result<(FeatureMatrix, Vocabulary)> {
        let mut names = BTreeSet::new();
        for features in data {
            for (key, value) in features {
                self.for_each_cell(key, value, |column, _| {
                    names.insert(column);
                })?;
            }
        }

        let vocabulary = Vocabulary::from_sorted(names.into_iter().collect());
        let matrix = self.transform(data, &vocabulary)?;
        Ok((matrix, vocabulary))
    }

    /// Encode mappings against a fixed vocabulary; unknown columns are dropped.
    pub fn transform(&self, data: &[FeatureMap], vocabulary: &Vocabulary) -> Result<FeatureMatrix> {
        let n_features = vocabulary.len();
        let mut rows = Vec::with_capacity(data.len());

        for features in data {
            let mut row = vec![0.0; n_features];
            for (key, value) in features {
                self.for_each_cell(key, value, |column, cell| {
                    if let Some(i) = vocabulary.index_of(&column) {
                        row[i] += cell;
                    }
                })?;
            }
            rows.push(row);
        }

        Ok(FeatureMatrix { rows, n_features })
    }

    fn for_each_cell<F: FnMut(String, f64)>(&self, key: &str, value: &FeatureValue, mut f: F) -> Result<()> {
        match value {
            FeatureValue::Number(x) => {
                if !x.is_finite() {
                    return Err(TrainerError::InvalidFeature {
                        name: key.to_string(),
                        message: format!("non-finite value {}", x),
                    });
                }
                f(key.to_string(), *x);
            }
            FeatureValue::Bool(b) => f(key.to_string(), if *b { 1.0 } else { 0.0 }),
            FeatureValue::Text(s) => f(self.one_hot_name(key, s), 1.0),
            FeatureValue::TextList(items) => {
                for s in items {
                    f(self.one_hot_name(key, s), 1.0);
                }
            }
        }
        Ok(())
    }

    fn one_hot_name(&self, key: &str, value: &str) -> String {
        format!("{}{}{}", key, self.separator, value)
    }
}
