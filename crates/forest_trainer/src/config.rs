//! Training run configuration
//!
//! Defaults reproduce the fixed experiment: 10 book folds shuffled with
//! seed 42, 30 class-balanced trees per fold seeded with 13.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{Result, TrainerError};
use crate::extra_trees::ExtraTreesParams;
use crate::vectorizer::DEFAULT_SEPARATOR;

/// Full configuration of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Line-delimited JSON truth file
    pub input: PathBuf,
    /// Forest artifact destination
    pub output: PathBuf,
    pub folds: FoldConfig,
    pub ensemble: ExtraTreesParams,
    pub report: ReportConfig,
    /// Separator between a categorical key and its value in column names
    pub separator: String,
}

/// Book-level k-fold settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldConfig {
    pub n_splits: usize,
    pub seed: u64,
    pub shuffle: bool,
}

/// Per-fold diagnostic output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Print the lowest threshold reaching `min_precision`
    pub operating_point: bool,
    pub min_precision: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("truth-data/truth.jsonl"),
            output: PathBuf::from("forest.json"),
            folds: FoldConfig::default(),
            ensemble: ExtraTreesParams::default(),
            report: ReportConfig::default(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            n_splits: 10,
            seed: 42,
            shuffle: true,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            operating_point: true,
            min_precision: 0.8,
        }
    }
}

impl TrainingConfig {
    /// Load from a TOML file; omitted keys keep their defaults.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|err| TrainerError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.folds.n_splits == 0 {
            return Err(TrainerError::Config("folds.n_splits must be at least 1".to_string()));
        }
        if self.ensemble.n_estimators == 0 {
            return Err(TrainerError::Config("ensemble.n_estimators must be at least 1".to_string()));
        }
        if self.ensemble.min_samples_split < 2 {
            return Err(TrainerError::Config("ensemble.min_samples_split must be at least 2".to_string()));
        }
        if !(self.report.min_precision > 0.0 && self.report.min_precision <= 1.0) {
            return Err(TrainerError::Config(format!(
                "report.min_precision must be in (0, 1], got {}",
                self.report.min_precision
            )));
        }
        if self.separator.is_empty() {
            return Err(TrainerError::Config("separator must not be empty".to_string()));
        }
        Ok(())
    }
}
