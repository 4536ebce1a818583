//! CatOpt CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use co_events::{ToyConfig, generate_toy_data};
use co_fit::{FitConfig, perform_fit};
use co_limit::{LimitConfig, expected_limit};
use co_search::{GridConfig, SearchConfig, optimise_boundary};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "catopt")]
#[command(about = "CatOpt - expected-limit optimisation for categorised resonance searches")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a toy dataset, fit the background and report the expected limit
    FitToy {
        /// Number of background events
        #[arg(long, default_value = "1000")]
        n_bkg: usize,

        /// Number of signal events
        #[arg(long, default_value = "100")]
        n_sig: usize,

        /// True background mass decay rate
        #[arg(long, default_value = "0.01")]
        lambda: f64,

        /// RNG seed
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a toy dataset and optimise the category boundaries
    OptimiseToy {
        /// Number of background events
        #[arg(long, default_value = "10000")]
        n_bkg: usize,

        /// Number of signal events
        #[arg(long, default_value = "10000")]
        n_sig: usize,

        /// True background mass decay rate
        #[arg(long, default_value = "0.05")]
        lambda: f64,

        /// Lowest score considered as a cut position
        #[arg(long, default_value = "0.5")]
        low: f64,

        /// Number of free cut positions per candidate
        #[arg(long, default_value = "1")]
        n_bounds: usize,

        /// Add a catch-all category below the lowest cut
        #[arg(long)]
        include_lower: bool,

        /// RNG seed
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct FitToyReport {
    true_n_sig: f64,
    true_n_bkg: f64,
    fit_n_sig: f64,
    fit_n_bkg: f64,
    lambda: f64,
    lambda_up: f64,
    lambda_down: f64,
    expected_limit: f64,
}

fn write_report<T: Serialize>(report: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn fit_toy(n_bkg: usize, n_sig: usize, lambda: f64, seed: u64, output: Option<&PathBuf>) -> Result<()> {
    let toy = ToyConfig { n_bkg, n_sig, lambda, ..Default::default() };
    let (bkg, sig) = generate_toy_data(&toy, seed)?;

    let fit_config = FitConfig::default();
    let sr = fit_config.signal_region;
    let true_n_sig = sig.weight_sum_in_window(&sr);
    let true_n_bkg = bkg.weight_sum_in_window(&sr);

    let yields = perform_fit(&sig, &bkg, &fit_config)?;
    let limit = expected_limit(&[yields.n_sig], &[yields.n_bkg], &LimitConfig::default())?;

    eprintln!("true (fit) n_sig: {true_n_sig:.0} ({:.2})", yields.n_sig);
    eprintln!("true (fit) n_bkg: {true_n_bkg:.0} ({:.2})", yields.n_bkg);
    eprintln!("95% CL limit on mu: {limit:.4}");

    write_report(
        &FitToyReport {
            true_n_sig,
            true_n_bkg,
            fit_n_sig: yields.n_sig,
            fit_n_bkg: yields.n_bkg,
            lambda: yields.model.lambda(),
            lambda_up: yields.model.lambda_up(),
            lambda_down: yields.model.lambda_down(),
            expected_limit: limit,
        },
        output,
    )
}

#[allow(clippy::too_many_arguments)]
fn optimise_toy(
    n_bkg: usize,
    n_sig: usize,
    lambda: f64,
    low: f64,
    n_bounds: usize,
    include_lower: bool,
    seed: u64,
    output: Option<&PathBuf>,
) -> Result<()> {
    let toy = ToyConfig { n_bkg, n_sig, lambda, ..Default::default() };
    let (bkg, sig) = generate_toy_data(&toy, seed)?;

    let config = SearchConfig {
        grid: GridConfig { low, n_bounds, include_lower, ..Default::default() },
        ..Default::default()
    };
    let outcome = optimise_boundary(&sig, &bkg, &config)?;

    eprintln!(
        "optimal boundaries {:?} with expected limit {:.5} ({} valid candidates)",
        outcome.optimal_boundaries.cuts(),
        outcome.optimal_limit,
        outcome.valid_boundaries.len()
    );
    eprintln!(
        "best AMS {:.3} at boundaries {:?}",
        outcome.best_ams,
        outcome.best_ams_boundaries.cuts()
    );

    write_report(&outcome, output)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::FitToy { n_bkg, n_sig, lambda, seed, output } => {
            fit_toy(n_bkg, n_sig, lambda, seed, output.as_ref())
        }
        Commands::OptimiseToy {
            n_bkg,
            n_sig,
            lambda,
            low,
            n_bounds,
            include_lower,
            seed,
            threads,
            output,
        } => {
            if threads > 0 {
                let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
            }
            optimise_toy(n_bkg, n_sig, lambda, low, n_bounds, include_lower, seed, output.as_ref())
        }
    }
}
