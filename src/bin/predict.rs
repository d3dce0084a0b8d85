//! Forecast the value following the end of a temperature series
//!
//! Usage: cargo run --bin predict -- --model temperature_model.bin --data data/turkey_temperature.csv

use anyhow::{Context, Result};
use clap::Parser;
use temperature_rnn::{ConvLstmNetwork, SeriesLoader};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Forecast the next temperature")]
struct Args {
    /// Model file written by `train`
    #[arg(short, long)]
    model: String,

    /// Temperature CSV (value in the second column)
    #[arg(short, long)]
    data: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
    let args = Args::parse();

    let model = ConvLstmNetwork::load(&args.model)
        .with_context(|| format!("loading model {}", args.model))?;
    let series = SeriesLoader::load_path(&args.data)
        .with_context(|| format!("loading series {}", args.data))?;

    let next = model
        .forecast_next(series.values())
        .context("forecasting the next value")?;

    if let Some(window_size) = model.window_size() {
        println!("Window size (from model): {}", window_size);
    }
    println!(
        "Last observed value (step {}): {:.3}",
        series.len() - 1,
        series.values()[series.len() - 1]
    );
    println!("Forecast for step {}: {:.3}", series.len(), next);

    Ok(())
}
