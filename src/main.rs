use anyhow::{Context, Result};
use clap::Parser;
use csv::WriterBuilder;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use halfspace_stream::config::DetectorConfig;
use halfspace_stream::stream::iter_csv::IterCsv;
use halfspace_stream::StreamDetector;

/// Streaming Half-Space Trees anomaly scoring.
///
/// Reads comma-delimited samples with a header row and writes one
/// `score,threshold,is_normal` row per sample.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input CSV file, stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output CSV file, stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Lower bound of every dimension when no config file is given
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    min: Vec<f64>,

    /// Upper bound of every dimension when no config file is given
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    max: Vec<f64>,

    /// Seed for tree construction (overrides config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Ignore the first column of input (e.g. timestamps)
    #[arg(long)]
    ignore_first_column: bool,
}

fn load_config(args: &Args) -> Result<DetectorConfig> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DetectorConfig::default(),
    };
    if !args.min.is_empty() || !args.max.is_empty() {
        config.trees.min_bounds = args.min.clone();
        config.trees.max_bounds = args.max.clone();
    }
    if args.seed.is_some() {
        config.trees.seed = args.seed;
    }
    config.validate()?;
    Ok(config)
}

fn run<R: io::Read, W: Write>(
    detector: &mut StreamDetector<f64>,
    samples: IterCsv<f64, R>,
    output: W,
) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(output);
    csv_writer.write_record(["score", "threshold", "is_normal"])?;

    let start = Instant::now();
    let mut n_samples: u64 = 0;
    let mut n_anomalies: u64 = 0;
    for sample in samples {
        let verdict = detector.process(&sample?)?;
        n_samples += 1;
        if !verdict.is_normal {
            n_anomalies += 1;
        }
        csv_writer.serialize((verdict.score, verdict.threshold, verdict.is_normal))?;
    }
    csv_writer.flush()?;

    info!(
        n_samples,
        n_anomalies,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "stream processed"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let mut detector = StreamDetector::<f64>::from_config(&config)?;
    info!(threshold = %detector.threshold(), "detector ready");

    let skip_columns = usize::from(args.ignore_first_column);
    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(io::BufWriter::new(
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    match &args.input {
        Some(path) => {
            let samples = IterCsv::from_path(path, skip_columns)
                .with_context(|| format!("opening {}", path.display()))?;
            run(&mut detector, samples, output)
        }
        None => {
            let samples = IterCsv::new(io::stdin().lock(), skip_columns)?;
            run(&mut detector, samples, output)
        }
    }
}
