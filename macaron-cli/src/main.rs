//! MACARON CLI
//!
//! Command-line front end for randomizing network interface hardware
//! addresses.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod ui;

use commands::GlobalOptions;

#[derive(Parser)]
#[command(name = "macaron")]
#[command(about = "MACARON - randomize network interface hardware addresses", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Run address-changing commands through `sudo -n`
    #[arg(long, global = true)]
    sudo: bool,

    /// Do not fall back to ifconfig/systemctl when the primary tool fails
    #[arg(long, global = true)]
    no_fallback: bool,

    /// Timeout for each external command, in seconds
    #[arg(long, global = true, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=600))]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// List physical interfaces with current and original addresses
    Scan {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Assign fresh random addresses
    Randomize {
        /// Interfaces to randomize
        interfaces: Vec<String>,

        /// Randomize every eligible interface
        #[arg(short, long)]
        all: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Restore original addresses
    Restore {
        /// Interfaces to restore
        interfaces: Vec<String>,

        /// Restore every interface with a known original address
        #[arg(short, long)]
        all: bool,
    },

    /// Randomize every eligible interface on a timer until interrupted
    Auto {
        /// Minutes between randomizations (1-1440)
        #[arg(short, long, default_value = "30")]
        interval: u32,
    },

    /// Check tool availability and privileges
    Diagnose {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("macaron_cli=debug,macaron_core=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("macaron_cli=info,macaron_core=warn")
            .with_writer(std::io::stderr)
            .init();
    }

    let options = GlobalOptions {
        verbose: cli.verbose,
        use_sudo: cli.sudo,
        allow_fallbacks: !cli.no_fallback,
        timeout_secs: cli.timeout,
    };

    // Dispatch commands
    let result = match cli.command {
        Commands::Scan { json } => commands::scan::run(&options.engine(), json, options.verbose).await,
        Commands::Randomize {
            interfaces,
            all,
            yes,
        } => commands::randomize::run(&options.engine(), &interfaces, all, yes).await,
        Commands::Restore { interfaces, all } => {
            commands::restore::run(&options.engine(), &interfaces, all).await
        }
        Commands::Auto { interval } => commands::auto::run(&options.engine(), interval).await,
        Commands::Diagnose { json } => commands::diagnose::run(json),
    };

    if let Err(err) = &result {
        ui::error(&format!("{:#}", err));
    }
    result
}
