use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ct_cli::commands::plan::PlanOutput;
use ct_cli::commands::{dump, estimate, open_input, plan, times};
use ct_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support; stdout carries results only
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = io::stdout().lock();
    match command {
        Commands::Times => {
            config.validate().context("invalid configuration")?;
            times::run(&mut stdout, &config)?;
        }
        Commands::Estimate {
            method,
            confidence,
            seed,
            input,
        } => {
            if let Some(method) = method {
                config.method = method.into();
            }
            if let Some(confidence) = confidence {
                config.confidence = confidence;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            config.validate().context("invalid configuration")?;
            let estimator = config.estimator()?;
            let reader = open_input(input.as_deref())?;
            estimate::run(reader, &mut stdout, &estimator)?;
        }
        Commands::Plan {
            intervals,
            tracks,
            debug,
            json,
        } => {
            if let Some(tracks) = tracks {
                config.tracks = tracks;
            }
            config.validate().context("invalid configuration")?;
            let intervals = plan::load_intervals(&intervals)?;
            plan::run(
                io::stdin().lock(),
                &mut stdout,
                &intervals,
                config.track_count()?,
                PlanOutput { debug, json },
            )?;
        }
        Commands::Dump { input } => {
            let reader = open_input(input.as_deref())?;
            dump::run(reader, &mut stdout)?;
        }
    }

    Ok(())
}
