//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use ct_core::Method;

/// Cycle time estimator and capacity planner.
///
/// Measures how long finished stories actually took, turns those durations
/// into per-category confidence intervals, and plans a batch of stories
/// across parallel tracks.
#[derive(Debug, Parser)]
#[command(name = "ct", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch recent stories and print their cycle times as JSON.
    Times,

    /// Turn cycle times into per-category confidence intervals.
    Estimate {
        /// Estimation method (overrides config).
        #[arg(long, value_enum)]
        method: Option<MethodArg>,

        /// Confidence level, strictly between 0 and 1 (overrides config).
        #[arg(long)]
        confidence: Option<f64>,

        /// Seed for reproducible resampling (overrides config).
        #[arg(long)]
        seed: Option<u64>,

        /// Cycle times JSON file. Reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Plan stories read from stdin across parallel tracks.
    Plan {
        /// Confidence intervals JSON file.
        #[arg(long)]
        intervals: PathBuf,

        /// Number of parallel tracks (overrides config).
        #[arg(long)]
        tracks: Option<usize>,

        /// Print every track's total and stories.
        #[arg(long)]
        debug: bool,

        /// Output the full plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print every cycle time of at least five minutes, in hours, sorted.
    Dump {
        /// Cycle times JSON file. Reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

/// Estimation method as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Parametric,
    Resampling,
}

impl From<MethodArg> for Method {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Parametric => Self::Parametric,
            MethodArg::Resampling => Self::Resampling,
        }
    }
}
