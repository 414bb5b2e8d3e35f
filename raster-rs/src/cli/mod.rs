//! Command-line interface for RASTER.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{ConfigError, RasterConfig};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "raster")]
#[command(about = "Contraction Clustering (RASTER) for 2D point sets", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the RASTER parameters shared by all subcommands.
#[derive(clap::Args, Debug, Clone, Default)]
struct RasterArgs {
    /// Decimal digits kept when tiling (scalar = 10^precision)
    #[arg(short, long)]
    precision: Option<f64>,
    /// Minimum points for a tile to be dense
    #[arg(short, long)]
    threshold: Option<usize>,
    /// Minimum tiles per cluster
    #[arg(short, long)]
    min_size: Option<usize>,
    /// Number of parallel projection workers
    #[arg(long)]
    partitions: Option<usize>,
    /// Retain points per tile (RASTER prime)
    #[arg(long)]
    prime: bool,
    /// Input CSV has a header row
    #[arg(long)]
    headers: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster a CSV of points and write label and cluster CSVs
    Cluster {
        /// Input CSV file (x,y per row)
        csv_file: PathBuf,
        /// Output directory for result CSVs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[command(flatten)]
        raster: RasterArgs,
    },

    /// Cluster a CSV of points and render a scatter plot (PNG)
    Plot {
        /// Input CSV file (x,y per row)
        csv_file: PathBuf,
        /// Output PNG file path (defaults to same name as the CSV with .png extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Maximum number of points to plot (subsamples if exceeded)
        #[arg(long)]
        max_points: Option<usize>,
        #[command(flatten)]
        raster: RasterArgs,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<60} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 37 {
            let head: String = value.chars().take(34).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<37} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Merge CLI overrides into the configured parameters.
fn resolve_raster_config(args: &RasterArgs, base: &RasterConfig) -> RasterConfig {
    RasterConfig {
        precision: args.precision.unwrap_or(base.precision),
        threshold: args.threshold.unwrap_or(base.threshold),
        min_size: args.min_size.unwrap_or(base.min_size),
        partitions: args.partitions.unwrap_or(base.partitions),
        retain_points: args.prime || base.retain_points,
    }
}

/// Load the pipeline config.
///
/// An unreadable file falls back to defaults with a warning. Malformed YAML or
/// out-of-range parameters are errors.
fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };

    match PipelineConfig::from_yaml(path) {
        Ok(cfg) => {
            info!("Loaded config from: {}", path.display());
            Ok(cfg)
        }
        Err(ConfigError::Io(e)) => {
            warn!("Failed to read config {}: {}, using defaults", path.display(), e);
            Ok(PipelineConfig::default())
        }
        Err(e) => Err(e),
    }
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid config: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Cluster {
            csv_file,
            output_dir,
            raster,
        } => {
            cmd_cluster(&csv_file, output_dir, &raster, &config);
        }
        Commands::Plot {
            csv_file,
            output,
            max_points,
            raster,
        } => {
            cmd_plot(&csv_file, output, max_points, &raster, &config);
        }
    }
}

fn print_parameters(config: &RasterConfig) {
    println!("Parameters:");
    println!("  precision: {}", config.precision);
    println!("  threshold: {}", config.threshold);
    println!("  min_size: {}", config.min_size);
    println!("  partitions: {}", config.partitions);
    println!("  prime: {}", config.retain_points);
}

fn cmd_cluster(
    csv_file: &Path,
    output_dir: Option<PathBuf>,
    args: &RasterArgs,
    config: &PipelineConfig,
) {
    use crate::processors::clustering::{self, OUTLIER};

    let start = Instant::now();
    let raster_config = resolve_raster_config(args, &config.raster);
    let has_headers = args.headers || config.input.has_headers;

    let effective_output_dir = output_dir.unwrap_or_else(|| {
        csv_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    println!("Running RASTER clustering...");
    println!("Input: {}", csv_file.display());
    println!("Output directory: {}", effective_output_dir.display());
    print_parameters(&raster_config);

    let spinner = create_spinner("Clustering points...");

    match clustering::process_csv_clustering(
        csv_file,
        Some(&effective_output_dir),
        &raster_config,
        has_headers,
    ) {
        Ok(output) => {
            spinner.finish_and_clear();

            let outliers = output.labels.iter().filter(|&&l| l == OUTLIER).count();

            print_summary(
                "Clustering Complete",
                &[
                    ("Input file", csv_file.display().to_string()),
                    ("Labels CSV", output.labels_csv.display().to_string()),
                    ("Clusters CSV", output.clusters_csv.display().to_string()),
                    ("Points processed", output.labels.len().to_string()),
                    ("Clusters found", output.num_clusters.to_string()),
                    ("Outliers", outliers.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Clustering failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_plot(
    csv_file: &Path,
    output: Option<PathBuf>,
    max_points: Option<usize>,
    args: &RasterArgs,
    config: &PipelineConfig,
) {
    use crate::core::loaders;
    use crate::processors::clustering::Raster;
    use crate::visualization;

    let start = Instant::now();
    let raster_config = resolve_raster_config(args, &config.raster);
    let has_headers = args.headers || config.input.has_headers;
    let max_points = max_points.unwrap_or(config.plot.max_points);

    let output_path = output.unwrap_or_else(|| csv_file.with_extension("png"));

    println!("Plotting RASTER clusters...");
    println!("Input: {}", csv_file.display());
    println!("Output: {}", output_path.display());
    println!("Max points: {}", max_points);
    print_parameters(&raster_config);

    let mut raster = match Raster::new(raster_config) {
        Ok(r) => r,
        Err(e) => {
            error!("Invalid parameters: {}", e);
            std::process::exit(1);
        }
    };

    let spinner = create_spinner("Loading points...");

    let points = match loaders::load_points_csv(csv_file, has_headers) {
        Ok(p) => p,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load {}: {}", csv_file.display(), e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Clustering points...");

    let labels = match raster.fit(&points) {
        Ok(l) => l,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Clustering failed: {}", e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Generating plot...");

    match visualization::plot_labeled_points(&output_path, &points, &labels, max_points) {
        Ok(()) => {
            spinner.finish_and_clear();

            print_summary(
                "Plot Complete",
                &[
                    ("Input file", csv_file.display().to_string()),
                    ("Output PNG", output_path.display().to_string()),
                    ("Points", points.len().to_string()),
                    ("Clusters found", raster.num_clusters().to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Plotting failed: {}", e);
            std::process::exit(1);
        }
    }
}
