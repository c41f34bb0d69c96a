//! Poetry page forest trainer
//!
//! Loads per-page feature records, vectorizes them, cross-validates an
//! extremely randomized trees classifier with folds drawn at book level,
//! and exports every fold's ensemble as a portable forest.

pub mod cart;
pub mod config;
pub mod cv;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod export;
pub mod extra_trees;
pub mod kfold;
pub mod metrics;
pub mod vectorizer;

use poetry_forest_core::ForestExport;

pub use config::TrainingConfig;
pub use cv::{CrossValidator, CvOutcome, FoldReport};
pub use dataset::{label_to_y, BookIndex, Dataset, RecordId};
pub use deterministic::LcgRng;
pub use errors::TrainerError;
pub use export::export_forest;
pub use extra_trees::{ClassWeight, ExtraTreesClassifier, ExtraTreesModel, ExtraTreesParams, MaxFeatures};
pub use kfold::{book_folds, flat_arr, KFold};
pub use vectorizer::{FeatureMatrix, FeatureVectorizer, Vocabulary};

/// Result of a complete training run, before anything is written
#[derive(Debug)]
pub struct TrainingRun {
    pub outcome: CvOutcome,
    pub forest: ForestExport,
}

/// Run the whole pipeline on an already loaded dataset.
pub fn train(dataset: &Dataset, config: &TrainingConfig) -> Result<TrainingRun, TrainerError> {
    config.validate()?;

    let vectorizer = FeatureVectorizer::new(&config.separator);
    let (matrix, vocabulary) = vectorizer.fit_transform(&dataset.features)?;
    tracing::info!(
        "Vectorized {} pages into {} feature columns",
        matrix.len(),
        vocabulary.len()
    );

    let outcome = CrossValidator::new(config.clone()).run(dataset, &matrix)?;
    let forest = export_forest(&vocabulary, &outcome.models)?;

    Ok(TrainingRun { outcome, forest })
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
