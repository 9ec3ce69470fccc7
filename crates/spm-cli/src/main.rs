//! spm - AFM image processing CLI
//!
//! Histogram reports for value lists and a demonstration pipeline on a
//! synthetic surface. No files are read or written.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "spm")]
#[command(author, version, about = "AFM image processing CLI")]
#[command(long_about = "
Histogram binning and image transformation tools for AFM data.

Examples:
  spm hist --values 1,2,3,4,5,6,7,8,9,10 --method manual --bins 5
  spm hist --values 0.8,1.1,1.3,0.9 --type probability --fit normal
  spm surface --rows 128 --cols 128 --filter gaussian --line-correction
  spm -j 4 surface --filter median
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of filter tasks (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Bin a list of values and print the histogram
    #[command(visible_alias = "h")]
    Hist(HistArgs),

    /// Run transformations on a synthetic tilted surface
    #[command(visible_alias = "s")]
    Surface(SurfaceArgs),
}

/// Arguments for the `hist` command.
#[derive(Args)]
struct HistArgs {
    /// Sample values, comma separated
    #[arg(long, required = true, value_delimiter = ',', allow_hyphen_values = true)]
    values: Vec<f64>,

    /// Binning method: manual, sturges, scott, fd, sqrt
    #[arg(short, long, default_value = "sturges")]
    method: String,

    /// Bin count (switches to manual binning)
    #[arg(short, long)]
    bins: Option<f64>,

    /// Bin width (switches to manual binning)
    #[arg(short, long)]
    width: Option<f64>,

    /// Fraction of smallest values to drop
    #[arg(long, default_value = "0")]
    trim_low: f64,

    /// Fraction of largest values to drop
    #[arg(long, default_value = "0")]
    trim_high: f64,

    /// Histogram type: count, probability, density, log-count
    #[arg(short = 't', long = "type", default_value = "count")]
    histogram_type: String,

    /// Accumulate counts
    #[arg(short, long)]
    cumulative: bool,

    /// Fit overlay: normal, log-normal, laplace
    #[arg(short, long)]
    fit: Option<String>,
}

/// Arguments for the `surface` command.
#[derive(Args)]
struct SurfaceArgs {
    /// Grid rows
    #[arg(short, long, default_value = "64")]
    rows: usize,

    /// Grid columns
    #[arg(short, long, default_value = "64")]
    cols: usize,

    /// Filter: gaussian, median, gradient, none
    #[arg(short, long, default_value = "gaussian")]
    filter: String,

    /// Remove per-line offsets and slopes before filtering
    #[arg(short, long)]
    line_correction: bool,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let threads = if cli.threads > 0 {
        Some(cli.threads)
    } else {
        None
    };

    match cli.command {
        Commands::Hist(args) => commands::hist::run(args, cli.verbose).context("hist failed"),
        Commands::Surface(args) => commands::surface::run(args, cli.verbose, threads).context("surface failed"),
    }
}
