//! Poetry forest trainer CLI
//!
//! Cross-validates by book, prints one AUC line per fold and writes the
//! exported forest once every fold has finished.

use anyhow::{Context, Result};
use clap::Parser;
use poetry_forest_trainer::{train, Dataset, TrainingConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "train-forest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a book-grouped poetry page classifier and export its forest", long_about = None)]
struct Args {
    /// Optional TOML configuration; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Line-delimited JSON truth file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Forest output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of book folds
    #[arg(long)]
    folds: Option<usize>,

    /// Seed for the book shuffle
    #[arg(long)]
    fold_seed: Option<u64>,

    /// Trees per fold ensemble
    #[arg(long)]
    trees: Option<usize>,

    /// Seed for ensemble fitting
    #[arg(long)]
    tree_seed: Option<u64>,

    /// Skip the precision/recall operating-point search
    #[arg(long)]
    no_operating_point: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => TrainingConfig::default(),
        };

        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(folds) = self.folds {
            config.folds.n_splits = folds;
        }
        if let Some(seed) = self.fold_seed {
            config.folds.seed = seed;
        }
        if let Some(trees) = self.trees {
            config.ensemble.n_estimators = trees;
        }
        if let Some(seed) = self.tree_seed {
            config.ensemble.seed = seed;
        }
        if self.no_operating_point {
            config.report.operating_point = false;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the fold report
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = args.into_config()?;

    info!("Poetry forest trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("Loading truth data from: {}", config.input.display());
    let dataset = Dataset::from_jsonl(&config.input)
        .with_context(|| format!("Failed to load {}", config.input.display()))?;

    let [negative, positive] = dataset.class_counts();
    info!(
        "Loaded {} pages from {} books ({} poetry, {} other, {:.1}% positive)",
        dataset.len(),
        dataset.book_index().len(),
        positive,
        negative,
        dataset.positive_rate() * 100.0
    );

    info!("Training configuration:");
    info!("  Folds: {} (seed {})", config.folds.n_splits, config.folds.seed);
    info!("  Trees per fold: {} (seed {})", config.ensemble.n_estimators, config.ensemble.seed);
    info!("  Class weight: {:?}", config.ensemble.class_weight);
    info!("  Max features: {:?}", config.ensemble.max_features);

    let run = train(&dataset, &config).context("Training failed")?;

    for report in &run.outcome.folds {
        println!("{}", report.auc_line());
        if let Some(line) = report.operating_point_line() {
            println!("{}", line);
        }
    }
    if let Some(mean) = run.outcome.mean_auc() {
        info!("Mean AUC over folds: {:.3}", mean);
    }

    let digest = run
        .forest
        .write_to_path(&config.output)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    info!("✓ Training completed successfully");
    info!("  Forest: {}", config.output.display());
    info!("  BLAKE3: {}", digest);

    Ok(())
}
