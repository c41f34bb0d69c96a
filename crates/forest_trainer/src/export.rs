//! Conversion of fitted fold ensembles into the portable forest

use poetry_forest_core::{serialize_tree, ForestExport};

use crate::errors::Result;
use crate::extra_trees::ExtraTreesModel;
use crate::vectorizer::Vocabulary;

/// Serialize every tree of every fold model, keeping fold order.
pub fn export_forest(vocabulary: &Vocabulary, models: &[ExtraTreesModel]) -> Result<ForestExport> {
    let mut forest = ForestExport::new(vocabulary.names().to_vec());

    for model in models {
        let trees = model
            .trees()
            .iter()
            .map(serialize_tree)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        forest.push_ensemble(trees);
    }

    forest.validate()?;
    Ok(forest)
}
