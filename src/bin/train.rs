//! Train the temperature forecaster and evaluate it on the validation range
//!
//! Usage: cargo run --release --bin train -- --data data/turkey_temperature.csv --output model.bin
//!
//! Exits with status 2 when the data cannot support the configured run
//! (malformed table, split or window out of range).

use anyhow::{Context, Result};
use clap::Parser;
use temperature_rnn::{AlignmentPolicy, Pipeline, PipelineConfig, SplitPoint};
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the temperature forecaster")]
struct Args {
    /// Cleaned temperature CSV (value in the second column)
    #[arg(short, long)]
    data: String,

    /// JSON pipeline configuration; flags below override it
    #[arg(short, long)]
    config: Option<String>,

    /// Output model file
    #[arg(short, long, default_value = "temperature_model.bin")]
    output: String,

    /// Training epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Input values per window
    #[arg(short, long)]
    window: Option<usize>,

    /// Train/validation cut index
    #[arg(long)]
    split_time: Option<usize>,

    /// Train/validation cut as a fraction of the series
    #[arg(long, conflicts_with = "split_time")]
    split_ratio: Option<f64>,

    /// Learning rate
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Compare every forecast value with the validation range
    #[arg(long)]
    full_alignment: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the effective configuration to this JSON file
    #[arg(long)]
    save_config: Option<String>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("reading configuration {}", path))?,
        None => PipelineConfig::default(),
    };

    if let Some(epochs) = args.epochs {
        config.training.epochs = epochs;
    }
    if let Some(window) = args.window {
        config.window_size = window;
    }
    if let Some(cut) = args.split_time {
        config.split = SplitPoint::At(cut);
    }
    if let Some(ratio) = args.split_ratio {
        config.split = SplitPoint::Ratio(ratio);
    }
    if let Some(lr) = args.learning_rate {
        config.training.learning_rate = lr;
    }
    if args.full_alignment {
        config.alignment = AlignmentPolicy::Full;
    }
    if let Some(seed) = args.seed {
        config.model.seed = Some(seed);
    }
    config.training = config.training.with_progress(!args.verbose);

    if let Some(path) = &args.save_config {
        config
            .to_json_file(path)
            .with_context(|| format!("writing configuration {}", path))?;
        info!("Saved configuration to {}", path);
    }

    let pipeline = Pipeline::new(config).context("invalid configuration")?;
    let report = match pipeline.run_path(&args.data) {
        Ok(report) => report,
        Err(err) if err.is_data_error() => {
            error!("Cannot train on {}: {}", args.data, err);
            std::process::exit(2);
        }
        Err(err) => {
            return Err(anyhow::Error::new(err).context(format!("training on {}", args.data)))
        }
    };

    println!(
        "Split at {}: {} training / {} validation points",
        report.split_time, report.train_len, report.valid_len
    );
    if let Some(loss) = report.training.final_loss() {
        println!("Final training loss: {:.6}", loss);
    }
    println!("{} for temperature forecast.", report.evaluation);

    report
        .model
        .save(&args.output)
        .with_context(|| format!("saving model to {}", args.output))?;
    println!("Model saved to {}", args.output);

    Ok(())
}
