mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::clean::CleanArgs;
use commands::kpis::KpisArgs;
use commands::rfm::RfmArgs;
use commands::segment::SegmentArgs;

/// Retail KPI reporting and RFM customer segmentation
#[derive(Parser)]
#[command(
    name = "rfm",
    version,
    about = "Retail KPI reporting and RFM customer segmentation",
    long_about = "A CLI for cleaning retail transaction exports, computing revenue KPIs, \
                  and scoring customers on Recency, Frequency and Monetary value with \
                  decimal precision. Reads CSV or JSON rows from --input, or JSON from stdin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop duplicate rows, returns and non-positive prices
    Clean(CleanArgs),
    /// Headline KPIs and top-N revenue tables
    Kpis(KpisArgs),
    /// Score customers and assign segments
    Rfm(RfmArgs),
    /// Look up the segment for one score triple
    Segment(SegmentArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Clean(args) => commands::clean::run_clean(args),
        Commands::Kpis(args) => commands::kpis::run_kpis(args),
        Commands::Rfm(args) => commands::rfm::run_rfm(args),
        Commands::Segment(args) => commands::segment::run_segment(args),
        Commands::Version => {
            println!("rfm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
