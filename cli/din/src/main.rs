//! din CLI — decompose Set Notation specifications into delay-insensitive
//! module networks.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "din", version, about = "Delay-insensitive network synthesis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose a specification into a module network
    Synth {
        /// Input specification (JSON)
        spec: PathBuf,
        /// Output format (text, json, network)
        #[arg(long, default_value = "text")]
        export: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Summarize a specification without synthesizing
    Inspect {
        /// Input specification (JSON)
        spec: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Synth {
            spec,
            export,
            output,
        } => commands::synth::run(&spec, &export, output.as_deref()),
        Commands::Inspect { spec } => commands::inspect::run(&spec),
    }
}
