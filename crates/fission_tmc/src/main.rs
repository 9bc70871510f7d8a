use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fission_tmc::{CampaignConfig, commands, init_logging};

#[derive(Parser, Debug)]
#[command(name = "fission_tmc")]
#[command(about = "Total Monte Carlo sensitivity analysis of fission-model parameters")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a campaign described by a YAML configuration file
    Run {
        /// Path to the campaign configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Seed for perturbation sampling, overriding the configuration
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Print a summary of a campaign file
    Inspect { file: PathBuf },
    /// Merge every campaign file in a directory into one
    Merge {
        dir: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Command::Run { config, seed } => {
            let config = CampaignConfig::load(&config)?;
            init_logging(&config.paths.output_dir, &args.log_level)?;
            let path = commands::run(&config, seed)?;
            println!("Campaign saved to {}", path.display());
        }
        Command::Inspect { file } => {
            print!("{}", commands::inspect(&file)?);
        }
        Command::Merge { dir, output } => {
            let log_dir = output
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            init_logging(&log_dir, &args.log_level)?;
            let merged = commands::merge(&dir, &output)?;
            println!(
                "Merged {} trials into {}",
                merged.results.trial_count(),
                output.display()
            );
        }
    }

    tracing::debug!("fission_tmc exiting");
    Ok(())
}
