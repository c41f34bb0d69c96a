//! Book-grouped cross-validation
//!
//! Books are partitioned into folds, each fold fits one ensemble on the
//! training books' pages and is scored on the held-out books' pages.
//! Fitted ensembles are returned in fold iteration order for export.

use tracing::{debug, info, warn};

use crate::config::TrainingConfig;
use crate::dataset::{Dataset, RecordId};
use crate::errors::{Result, TrainerError};
use crate::extra_trees::{ExtraTreesClassifier, ExtraTreesModel};
use crate::kfold::{book_folds, KFold};
use crate::metrics::{find_operating_point, roc_auc_score, OperatingPoint};
use crate::vectorizer::FeatureMatrix;

/// Evaluation of one fold
#[derive(Clone, Debug, PartialEq)]
pub struct FoldReport {
    /// 0-based position in fold iteration order
    pub fold: usize,
    pub train_books: Vec<RecordId>,
    pub test_books: Vec<RecordId>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// `None` when the test pages do not contain both classes
    pub auc: Option<f64>,
    pub operating_point: Option<OperatingPoint>,
}

impl FoldReport {
    /// `AUC: 0.873`, or `AUC: n/a` when undefined
    pub fn auc_line(&self) -> String {
        match self.auc {
            Some(auc) => format!("AUC: {:1.3}", auc),
            None => "AUC: n/a".to_string(),
        }
    }

    /// ` 07. P: 0.812 . R: 0.640` when an operating point was found
    pub fn operating_point_line(&self) -> Option<String> {
        self.operating_point.map(|p| {
            format!(" {:02}. P: {:1.3} . R: {:1.3}", p.step, p.precision, p.recall)
        })
    }
}

/// Everything the fold loop produces
#[derive(Clone, Debug)]
pub struct CvOutcome {
    /// One fitted ensemble per fold, in fold order
    pub models: Vec<ExtraTreesModel>,
    pub folds: Vec<FoldReport>,
}

impl CvOutcome {
    /// Mean over folds with a defined AUC
    pub fn mean_auc(&self) -> Option<f64> {
        let aucs: Vec<f64> = self.folds.iter().filter_map(|f| f.auc).collect();
        if aucs.is_empty() {
            return None;
        }
        Some(aucs.iter().sum::<f64>() / aucs.len() as f64)
    }
}

/// Runs the fold loop
pub struct CrossValidator {
    config: TrainingConfig,
}

impl CrossValidator {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    fn kfold(&self) -> KFold {
        let kfold = KFold::new(self.config.folds.n_splits).with_seed(self.config.folds.seed);
        if self.config.folds.shuffle {
            kfold
        } else {
            kfold.without_shuffle()
        }
    }

    /// Train and evaluate one ensemble per fold.
    pub fn run(&self, dataset: &Dataset, matrix: &FeatureMatrix) -> Result<CvOutcome> {
        if dataset.len() != matrix.len() {
            return Err(TrainerError::Training(format!(
                "{} pages but {} feature rows",
                dataset.len(),
                matrix.len()
            )));
        }

        let index = dataset.book_index();
        let folds = book_folds(&index, &self.kfold())?;
        let classifier = ExtraTreesClassifier::new(self.config.ensemble.clone());
        let n_folds = folds.len();
        info!("Cross-validating {} books in {} folds", index.len(), n_folds);

        let mut models = Vec::with_capacity(n_folds);
        let mut reports = Vec::with_capacity(n_folds);

        for (fold_idx, fold) in folds.into_iter().enumerate() {
            info!(
                "Fold {}/{}: {} train books ({} pages), {} test books ({} pages)",
                fold_idx + 1,
                n_folds,
                fold.train_books.len(),
                fold.train_rows.len(),
                fold.test_books.len(),
                fold.test_rows.len()
            );
            debug!("Fold {} test books: {:?}", fold_idx + 1, fold.test_books);

            let train_x = matrix.select(&fold.train_rows);
            let train_y = select_labels(&dataset.labels, &fold.train_rows);
            let model = classifier
                .fit(&train_x, &train_y)
                .map_err(|err| TrainerError::Training(format!("fold {}: {}", fold_idx + 1, err)))?;

            let test_x = matrix.select(&fold.test_rows);
            let test_y = select_labels(&dataset.labels, &fold.test_rows);
            let scores = model.predict_proba(&test_x);

            let auc = roc_auc_score(&test_y, &scores);
            if auc.is_none() {
                warn!(
                    "Fold {}: AUC undefined, test pages do not contain both classes",
                    fold_idx + 1
                );
            }

            let operating_point = if self.config.report.operating_point {
                find_operating_point(&test_y, &scores, self.config.report.min_precision)
            } else {
                None
            };

            reports.push(FoldReport {
                fold: fold_idx,
                train_books: fold.train_books,
                test_books: fold.test_books,
                train_rows: fold.train_rows.len(),
                test_rows: fold.test_rows.len(),
                auc,
                operating_point,
            });
            models.push(model);
        }

        Ok(CvOutcome {
            models,
            folds: reports,
        })
    }
}

fn select_labels(labels: &[u8], rows: &[usize]) -> Vec<u8> {
    rows.iter().map(|&i| labels[i]).collect()
}
