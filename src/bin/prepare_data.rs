//! Filter the global land temperature table down to one country
//!
//! Usage: cargo run --bin prepare_data -- --source GlobalLandTemperaturesByCountry.csv --dest data/turkey_temperature.csv

use anyhow::{Context, Result};
use clap::Parser;
use temperature_rnn::CountryFilter;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Extract one country's temperature series")]
struct Args {
    /// Raw GlobalLandTemperaturesByCountry CSV
    #[arg(short, long)]
    source: String,

    /// Cleaned output CSV
    #[arg(short, long, default_value = "data/turkey_temperature.csv")]
    dest: String,

    /// Country to keep
    #[arg(short, long, default_value = "Turkey")]
    country: String,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Some(parent) = std::path::Path::new(&args.dest).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {:?}", parent))?;
        }
    }

    let filter = CountryFilter::new(args.country);
    let summary = filter
        .filter_file(&args.source, &args.dest)
        .with_context(|| format!("filtering {}", args.source))?;

    println!(
        "Kept {} of {} rows for {} ({} incomplete rows dropped) -> {}",
        summary.rows_written,
        summary.rows_read,
        filter.country(),
        summary.rows_dropped,
        args.dest
    );

    Ok(())
}
