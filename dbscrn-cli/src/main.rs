//! dbscrn CLI: Command-line interface for density-based clustering.
//!
//! Reads a TSV, ARFF or PA dataset, clusters it with DBSCAN, DBSCANRN or
//! DBSCANRN-TI and writes `OUT.csv`, `DEBUG.tsv` and `STAT.json`.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};

use dbscrn_algorithms::{
    evaluate_quality, run_clustering, AlgorithmParams, ClusteringAlgorithm, ReferencePoint,
    DEFAULT_TIE_TOLERANCE,
};
use dbscrn_core::Minkowski;
use dbscrn_io::{run_directory, DatasetReader, ReportWriter, StatReport};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    DbscrnIo(#[from] dbscrn_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] dbscrn_core::Error),
}

/// Clustering algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    /// DBSCAN over eps-neighborhoods
    Dbscan,
    /// DBSCANRN, exhaustive k+NN search
    Dbscanrn,
    /// DBSCANRN with triangle-inequality pruning
    #[value(name = "dbscanrn_ti")]
    DbscanrnTi,
}

impl From<Algorithm> for ClusteringAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Dbscan => ClusteringAlgorithm::Dbscan,
            Algorithm::Dbscanrn => ClusteringAlgorithm::DbscanRn,
            Algorithm::DbscanrnTi => ClusteringAlgorithm::DbscanRnTi,
        }
    }
}

/// Reference point for the triangle-inequality search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Reference {
    /// Coordinate-wise minimum of the dataset
    Min,
    /// The origin
    Origin,
}

/// Parameters shared by `run` and `benchmark`.
#[derive(Args, Debug, Clone)]
struct ParamArgs {
    /// DBSCAN radius (neighbors lie strictly closer)
    #[arg(short, long, default_value = "2.0")]
    eps: f64,

    /// DBSCAN minimum points, counting the point itself
    #[arg(long, default_value = "4")]
    min_points: usize,

    /// DBSCANRN neighborhood size, counting the point itself
    #[arg(short, default_value = "3")]
    k: usize,

    /// Minkowski power
    #[arg(short, long = "minkowski-power", default_value = "2.0")]
    m: f64,

    /// Reference point for dbscanrn_ti
    #[arg(long, value_enum, default_value = "min")]
    reference: Reference,

    /// Distances this close to the (k-1)-th neighbor count as tied
    #[arg(long, default_value_t = DEFAULT_TIE_TOLERANCE)]
    tie_tolerance: f64,
}

impl ParamArgs {
    fn to_params(&self) -> AlgorithmParams {
        AlgorithmParams {
            epsilon: self.eps,
            min_points: self.min_points,
            k: self.k,
            minkowski_power: self.m,
            tie_tolerance: self.tie_tolerance,
            reference: match self.reference {
                Reference::Min => ReferencePoint::CoordinateMinimum,
                Reference::Origin => ReferencePoint::Origin,
            },
        }
    }
}

/// Density-based clustering with reverse nearest neighbors.
#[derive(Parser)]
#[command(name = "dbscrn")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster a dataset and write reports
    Run {
        /// Input dataset (.tsv, .arff, or .txt/.pa pair)
        input: PathBuf,

        /// Base output directory
        #[arg(short, long, default_value = "out")]
        output: PathBuf,

        /// Clustering algorithm to use
        #[arg(short, long, value_enum, default_value = "dbscanrn_ti")]
        algorithm: Algorithm,

        #[command(flatten)]
        params: ParamArgs,

        /// Also compute the silhouette coefficient (quadratic in the number of points)
        #[arg(long)]
        silhouette: bool,
    },

    /// Show information about a dataset
    Info {
        /// Input dataset (.tsv, .arff, or .txt/.pa pair)
        input: PathBuf,
    },

    /// Time all algorithms on a dataset
    Benchmark {
        /// Input dataset (.tsv, .arff, or .txt/.pa pair)
        input: PathBuf,

        #[command(flatten)]
        params: ParamArgs,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            input,
            output,
            algorithm,
            params,
            silhouette,
        } => {
            let algorithm = ClusteringAlgorithm::from(algorithm);
            let params = params.to_params();

            let start = Instant::now();
            let reader = DatasetReader::open(&input)?;
            let dataset = reader.read()?;
            let read_time = start.elapsed();
            info!(
                "loaded {} points ({} dimensions) from {}",
                dataset.len(),
                dataset.dimensions(),
                input.display()
            );

            let outcome = run_clustering(&dataset, algorithm, &params)?;
            if let Some(shortfall) = outcome.shortfall {
                warn!(
                    "only {} points for a density parameter of {}; results are degenerate",
                    shortfall.available, shortfall.required
                );
            }

            let metrics_start = Instant::now();
            let metric = Minkowski::new(params.minkowski_power)?;
            let quality = evaluate_quality(&dataset, &outcome, metric, silhouette)?;
            let stats_time = metrics_start.elapsed();

            let directory = run_directory(&output, algorithm, &reader.dataset_name(), &params);
            let writer = ReportWriter::create(&directory)?;
            writer.write_out_csv(&dataset, &outcome)?;
            writer.write_debug_tsv(&dataset, &outcome)?;
            let report = StatReport::new(
                &input,
                &dataset,
                algorithm,
                &params,
                &outcome,
                &quality,
                &[
                    ("read_input_file", read_time),
                    ("stats_calculation", stats_time),
                ],
            )?;
            writer.write_stat_json(&report)?;

            let stats = outcome.statistics();
            println!("Algorithm: {}", algorithm);
            println!("Clusters: {}", stats.clusters);
            println!(
                "Core / border / noise: {} / {} / {}",
                stats.core_points, stats.border_points, stats.noise_points
            );
            println!(
                "Avg distance calculations: {:.2}",
                stats.avg_distance_calculations
            );
            if let Some(purity) = quality.purity {
                println!("Purity: {:.4}", purity);
            }
            if let Some(rand) = quality.rand {
                println!("RAND: {:.4}", rand.value);
            }
            println!(
                "Finished in {:.3}s, reports in {}",
                start.elapsed().as_secs_f64(),
                directory.display()
            );
        }

        Commands::Info { input } => {
            let dataset = DatasetReader::open(&input)?.read()?;
            println!("File: {}", input.display());
            println!("Points: {}", dataset.len());
            println!("Dimensions: {}", dataset.dimensions());

            if dataset.has_ground_truth() {
                let classes: BTreeSet<_> = dataset.labels()?.into_iter().collect();
                println!("Ground truth: yes ({} classes)", classes.len());
            } else {
                println!("Ground truth: no");
            }

            let minimum = dataset.coordinate_minimum();
            for (dim, lo) in minimum.iter().enumerate() {
                let hi = dataset
                    .iter()
                    .map(|p| p.coords[dim])
                    .fold(f64::NEG_INFINITY, f64::max);
                println!("x_{} range: {} - {}", dim, lo, hi);
            }
        }

        Commands::Benchmark {
            input,
            params,
            iterations,
        } => {
            let dataset = DatasetReader::open(&input)?.read()?;
            let params = params.to_params();
            let iterations = iterations.max(1);

            println!(
                "Benchmarking with {} points, {} iterations",
                dataset.len(),
                iterations
            );
            println!(
                "{:<12} | {:<15} | {:<15} | {:<15} | {:<12}",
                "Algorithm", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)", "Avg #calcs"
            );
            println!("{:-<82}", "");

            for algorithm in ClusteringAlgorithm::ALL {
                // Warmup
                let warmup = run_clustering(&dataset, algorithm, &params)?;
                let calcs = warmup.statistics().avg_distance_calculations;

                let mut times = Vec::with_capacity(iterations);
                for _ in 0..iterations {
                    let start = Instant::now();
                    run_clustering(&dataset, algorithm, &params)?;
                    times.push(start.elapsed().as_secs_f64() * 1000.0);
                }

                let min_time = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
                let max_time = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let mean_time = times.iter().sum::<f64>() / times.len() as f64;

                println!(
                    "{:<12} | {:<15.2} | {:<15.2} | {:<15.2} | {:<12.1}",
                    algorithm.as_str(),
                    mean_time,
                    min_time,
                    max_time,
                    calcs
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["dbscrn", "run", "data.tsv"]).unwrap();
        assert_eq!(cli.verbose, 0);
        let Commands::Run {
            algorithm, params, ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(algorithm, Algorithm::DbscanrnTi);
        assert_eq!(params.to_params(), AlgorithmParams::default());
    }

    #[test]
    fn test_parse_run_options() {
        let cli = Cli::try_parse_from([
            "dbscrn",
            "-vv",
            "run",
            "data.arff",
            "-a",
            "dbscan",
            "--eps",
            "0.5",
            "--min-points",
            "6",
            "-m",
            "1",
            "--reference",
            "origin",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run {
            algorithm, params, ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(ClusteringAlgorithm::from(algorithm), ClusteringAlgorithm::Dbscan);
        let params = params.to_params();
        assert!((params.epsilon - 0.5).abs() < f64::EPSILON);
        assert_eq!(params.min_points, 6);
        assert!((params.minkowski_power - 1.0).abs() < f64::EPSILON);
        assert_eq!(params.reference, ReferencePoint::Origin);
    }

    #[test]
    fn test_rejects_unknown_algorithm() {
        assert!(Cli::try_parse_from(["dbscrn", "run", "data.tsv", "-a", "optics"]).is_err());
    }
}
