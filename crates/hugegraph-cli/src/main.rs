use anyhow::Result;
use clap::{Parser, Subcommand};
use hugegraph_cli::commands::{self, wcc};
use hugegraph_cli::config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line interface for the HugeGraph analytics engine
#[derive(Parser)]
#[command(name = "hugegraph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, env = "HUGEGRAPH_CONFIG")]
    pub config: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute weakly connected components
    Wcc(wcc::WccArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stream output stays machine-readable
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "hugegraph_core=info,hugegraph_cli=info".into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "hugegraph_core=warn,hugegraph_cli=warn".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let cfg = config::Config::load(cli.config.as_deref())?;

    let output = commands::OutputContext {
        json: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Wcc(args) => wcc::execute(args, &cfg, &output),
    }
}
