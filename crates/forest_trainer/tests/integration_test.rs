//! End-to-end tests for the forest trainer
//!
//! Ensures the exported forest has the expected shape and that identical
//! inputs produce identical artifacts.

use anyhow::Result;
use poetry_forest_core::{ForestExport, TreeNode};
use poetry_forest_trainer::{train, Dataset, TrainingConfig};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::{NamedTempFile, TempDir};

/// 20 synthetic pages across 4 books, poetry pages have short indented lines
fn synthetic_lines() -> Vec<String> {
    let mut lines = Vec::new();
    for book in 0..4 {
        for page in 0..5 {
            let poetry = (book + page) % 3 == 0;
            let avg_line_len = if poetry { 12.3 + page as f64 } else { 48.0 + book as f64 };
            let font = if page % 2 == 0 { "serif" } else { "sans" };
            let label = if poetry { "POETRY" } else { "PROSE" };
            lines.push(format!(
                r#"{{"features": {{"avg_line_len": {}, "has_indent": {}, "font": "{}"}}, "label": "{}", "book": "book-{}", "page": {}}}"#,
                avg_line_len, poetry, font, label, book, page
            ));
        }
    }
    lines
}

fn write_truth(path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    for line in synthetic_lines() {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

fn load_synthetic() -> Result<Dataset> {
    let mut file = NamedTempFile::new()?;
    for line in synthetic_lines() {
        writeln!(file, "{}", line)?;
    }
    file.flush()?;
    Ok(Dataset::from_jsonl(file.path())?)
}

fn assert_binary_leaves(node: &TreeNode) {
    let mut leaves = 0;
    node.for_each_leaf(&mut |leaf| {
        assert_eq!(leaf.len(), 2, "every leaf must carry two class entries");
        leaves += 1;
    });
    assert!(leaves >= 1);
}

#[test]
fn test_forest_shape() -> Result<()> {
    let dataset = load_synthetic()?;
    assert_eq!(dataset.len(), 20);
    assert_eq!(dataset.book_index().len(), 4);

    let run = train(&dataset, &TrainingConfig::default())?;
    let forest = &run.forest;

    assert_eq!(
        forest.feature_names,
        vec!["avg_line_len", "font=sans", "font=serif", "has_indent"]
    );
    assert_eq!(forest.ensemble_count(), 10);
    for ensemble in &forest.forest {
        assert_eq!(ensemble.len(), 30);
        for tree in ensemble {
            assert_binary_leaves(tree);
        }
    }

    // 4 books over 10 folds: only the first 4 folds hold test pages.
    let tested: Vec<usize> = run.outcome.folds.iter().map(|f| f.test_rows).collect();
    assert_eq!(tested.iter().sum::<usize>(), 20);
    assert!(tested[4..].iter().all(|&n| n == 0));
    Ok(())
}

#[test]
fn test_artifact_is_byte_identical_across_runs() -> Result<()> {
    let dataset = load_synthetic()?;
    let dir = TempDir::new()?;
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");

    let digest1 = train(&dataset, &TrainingConfig::default())?.forest.write_to_path(&first)?;
    let digest2 = train(&dataset, &TrainingConfig::default())?.forest.write_to_path(&second)?;

    assert_eq!(digest1, digest2);
    assert_eq!(std::fs::read(&first)?, std::fs::read(&second)?);
    Ok(())
}

#[test]
fn test_written_forest_reads_back() -> Result<()> {
    let dataset = load_synthetic()?;
    let dir = TempDir::new()?;
    let path = dir.path().join("forest.json");

    let run = train(&dataset, &TrainingConfig::default())?;
    run.forest.write_to_path(&path)?;

    let text = std::fs::read_to_string(&path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    assert!(value["feature_names"].is_array());
    assert_eq!(value["forest"].as_array().map(Vec::len), Some(10));

    let back = ForestExport::from_json_str(&text)?;
    assert_eq!(back, run.forest);
    Ok(())
}

#[test]
fn test_different_tree_seed_changes_forest() -> Result<()> {
    let dataset = load_synthetic()?;
    let mut config = TrainingConfig::default();
    let baseline = train(&dataset, &config)?.forest;

    config.ensemble.seed = 14;
    let reseeded = train(&dataset, &config)?.forest;

    assert_eq!(baseline.feature_names, reseeded.feature_names);
    assert_ne!(baseline.forest, reseeded.forest);
    Ok(())
}

#[test]
fn test_cli_default_run() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::create_dir_all(dir.path().join("truth-data"))?;
    write_truth(&dir.path().join("truth-data/truth.jsonl"))?;

    let output = Command::new(env!("CARGO_BIN_EXE_train-forest"))
        .current_dir(dir.path())
        .output()?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout)?;
    let auc_lines = stdout.lines().filter(|l| l.starts_with("AUC: ")).count();
    assert_eq!(auc_lines, 10);

    let forest = ForestExport::from_json_str(&std::fs::read_to_string(dir.path().join("forest.json"))?)?;
    assert_eq!(forest.tree_count(), 300);
    Ok(())
}

#[test]
fn test_cli_malformed_input_writes_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::create_dir_all(dir.path().join("truth-data"))?;
    std::fs::write(
        dir.path().join("truth-data/truth.jsonl"),
        "{\"features\": {}, \"label\": \"POETRY\", \"book\": \"a\", \"page\": 1}\n{broken\n",
    )?;

    let output = Command::new(env!("CARGO_BIN_EXE_train-forest"))
        .current_dir(dir.path())
        .output()?;

    assert!(!output.status.success());
    assert!(!dir.path().join("forest.json").exists());
    Ok(())
}
