//! kiln CLI - inspect, verify and prefetch provider manifests.

use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;
mod output;
pub(crate) mod shared;

/// kiln - secure loader for pluggable providers.
#[derive(Debug, Parser)]
#[command(name = "kiln", version, about)]
struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format: plain (default) or json (for log aggregation).
    #[arg(long, global = true, default_value = "plain", value_parser = ["plain", "json"])]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch a manifest and print its contents.
    Fetch(commands::fetch::FetchArgs),
    /// Print the canonical fingerprint of a local manifest.
    Fingerprint(commands::fingerprint::FingerprintArgs),
    /// Verify the signature of a local manifest.
    Verify(commands::verify::VerifyArgs),
    /// Download and verify every artifact of a manifest into the cache.
    Prefetch(commands::prefetch::PrefetchArgs),
    /// Open a loading boundary and list the providers it registers.
    Inspect(commands::inspect::InspectArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = shared::load(cli.config.as_deref())?;

    // Initialize tracing; -v overrides the configured level.
    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    match cli.log_format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    };

    tracing::debug!("kiln starting with config: {:?}", cli.config);

    match &cli.command {
        Commands::Fetch(args) => commands::fetch::execute(args, &config),
        Commands::Fingerprint(args) => commands::fingerprint::execute(args),
        Commands::Verify(args) => commands::verify::execute(args),
        Commands::Prefetch(args) => commands::prefetch::execute(args, &config),
        Commands::Inspect(args) => commands::inspect::execute(args, &config),
    }
}
