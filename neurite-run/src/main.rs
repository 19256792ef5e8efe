//! Headless driver for the neurite growth simulation.
//!
//! Parses command-line options, grows a population of trees with
//! [`neurite_core::Population`] and prints the summary report. All
//! simulation logic lives in `neurite-core`; the `runner` module only
//! assembles options and formats output.

mod runner;

use clap::Parser;
use neurite_core::{GrowthError, ModelKind, PopulationConfig};
use tracing_subscriber::EnvFilter;

use runner::RunOptions;

/// Grow neurite trees under the BES, AD or ADcm growth model.
#[derive(Parser, Debug)]
#[command(name = "neurite-run", version, long_about = None)]
struct Args {
    /// Growth model: bes, ad or adcm
    #[arg(short, long, default_value = "bes")]
    model: String,

    /// Number of independently grown trees
    #[arg(short = 'n', long, default_value_t = 1)]
    trees: usize,

    /// Timestep
    #[arg(long, default_value_t = 1.0)]
    dt: f32,

    /// Simulation end time
    #[arg(long, default_value_t = 200.0)]
    t_stop: f64,

    /// Override the time after which branching stops
    #[arg(long)]
    branching_stop: Option<f64>,

    /// Time between terminal-count samples
    #[arg(long, default_value_t = 1.0)]
    sample_interval: f64,

    /// Seed of the first tree; tree i uses seed + i
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Print the keys and orders of the first tree
    #[arg(long, default_value_t = false)]
    print_tree: bool,

    /// Print the mean terminal count over time
    #[arg(long, default_value_t = false)]
    time_course: bool,

    /// Print the 2-D layout of the first tree
    #[arg(long, default_value_t = false)]
    layout: bool,

    /// Print a named value (e.g. concentration) at the soma and terminals of the first tree
    #[arg(long)]
    values: Option<String>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn into_options(self) -> Result<RunOptions, GrowthError> {
        Ok(RunOptions {
            model: self.model.parse::<ModelKind>()?,
            population: PopulationConfig {
                trees: self.trees,
                dt: self.dt,
                t_stop: self.t_stop,
                sample_interval: self.sample_interval,
                seed: self.seed,
            },
            branching_stop: self.branching_stop,
            print_tree: self.print_tree,
            time_course: self.time_course,
            layout: self.layout,
            values: self.values,
        })
    }
}

fn main() -> Result<(), GrowthError> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let options = args.into_options()?;
    let report = runner::run(&options)?;
    print!("{report}");
    Ok(())
}
