//! CLI entry point for the document clustering core.
//!
//! Reads feature vectors as a JSON array of arrays (file or stdin), runs
//! K-means or the elbow sweep, and prints JSON results on stdout.

use anyhow::{Context, Result, bail};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use doccluster::{ClusterCountSelector, KRange, Settings, VectorClusterer};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::Level;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Document vector clustering
#[derive(Parser)]
#[command(
    name = "doccluster",
    version = env!("CARGO_PKG_VERSION"),
    about = "Cluster document feature vectors with K-means",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for reproducible centroid initialization
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log solver progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Cluster vectors into a fixed number of groups
    #[command(
        about = "Run K-means for a fixed k",
        after_help = "Examples:\n  doccluster fit --k 3 --input vectors.json\n  cat vectors.json | doccluster fit --k 5 --seed 42"
    )]
    Fit {
        /// Number of clusters
        #[arg(short, long)]
        k: usize,

        /// JSON file with an array of vectors (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Pick a cluster count with the elbow method
    #[command(
        name = "select-k",
        about = "Sweep a k range and report the elbow",
        after_help = "Examples:\n  doccluster select-k --min 1 --max 6 --input vectors.json"
    )]
    SelectK {
        /// Smallest k to try (defaults to selection.k_min)
        #[arg(long)]
        min: Option<usize>,

        /// Largest k to try (defaults to selection.k_max)
        #[arg(long)]
        max: Option<usize>,

        /// JSON file with an array of vectors (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the effective settings
    #[command(about = "Display active settings as TOML")]
    Config,
}

#[derive(Debug, Serialize)]
struct FitOutput {
    k: usize,
    assignments: Vec<u32>,
    centroids: Vec<Vec<f32>>,
    iterations: usize,
    converged: bool,
    wcss: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load settings: {e}"))?;

    if cli.seed.is_some() {
        settings.kmeans.seed = cli.seed;
    }

    init_logging(cli.verbose || settings.debug);

    match cli.command {
        Commands::Fit { k, input } => {
            let vectors = read_vectors(input.as_deref())?;
            let clusterer = VectorClusterer::new(settings.kmeans_config(k));
            let result = clusterer
                .fit_detailed(&vectors)
                .with_context(|| format!("Clustering {} vectors into {k} groups", vectors.len()))?;

            print_json(&FitOutput {
                k,
                assignments: result.assignments.iter().map(|label| label.get()).collect(),
                centroids: result.centroids,
                iterations: result.iterations,
                converged: result.converged,
                wcss: result.wcss,
            })?;
        }
        Commands::SelectK { min, max, input } => {
            if let Some(min) = min {
                settings.selection.k_min = min;
            }
            if let Some(max) = max {
                settings.selection.k_max = max;
            }
            let vectors = read_vectors(input.as_deref())?;
            let config = settings.selection_config();
            let KRange { min, max } = config.k_range;
            let result = ClusterCountSelector::new(config)
                .select_k(&vectors)
                .with_context(|| format!("Selecting k in {min}..={max}"))?;

            print_json(&result)?;
        }
        Commands::Config => {
            let rendered =
                toml::to_string_pretty(&settings).context("Failed to render settings as TOML")?;
            print!("{rendered}");
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_vectors(input: Option<&Path>) -> Result<Vec<Vec<f32>>> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vectors from '{}'", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read vectors from stdin")?;
            buffer
        }
    };

    let vectors: Vec<Vec<f32>> =
        serde_json::from_str(&raw).context("Vectors must be a JSON array of number arrays")?;
    if vectors.is_empty() {
        bail!("No vectors supplied");
    }
    Ok(vectors)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
