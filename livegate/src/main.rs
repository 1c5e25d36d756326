//! LiveGate CLI
//!
//! Inspect what the loader sees in a schematic.
//!
//! # Usage
//!
//! ```bash
//! # Expand every <use> and write the result
//! livegate flatten board.svg -o flat.svg
//!
//! # Nets and their wires (colored per net), or as JSON
//! livegate nets board.svg
//! livegate nets board.svg --json
//!
//! # Gate symbols, behavior keys and port tables
//! livegate cells board.svg
//!
//! # Effective configuration
//! livegate config --config livegate.yaml
//! ```

mod cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "livegate")]
#[command(about = "Flatten SVG logic schematics and extract their nets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to a config YAML (defaults to ~/.config/livegate/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Expand every <use> reference and write the flattened SVG
    Flatten {
        /// Input SVG
        svg: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Stroke every wire with a per-net color
        #[arg(long)]
        color_nets: bool,
    },

    /// List nets and the wires on each
    Nets {
        svg: PathBuf,
        /// Print the net report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List gate symbols with their behavior keys and ports
    Cells { svg: PathBuf },

    /// Print the effective configuration as YAML
    Config,
}

fn main() -> anyhow::Result<()> {
    clilog::init_stderr_color_debug();
    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Flatten {
            svg,
            output,
            color_nets,
        } => cli::flatten::run(&config, svg, output.as_deref(), *color_nets),
        Command::Nets { svg, json } => cli::nets::run(&config, svg, *json),
        Command::Cells { svg } => cli::cells::run(&config, svg),
        Command::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}
