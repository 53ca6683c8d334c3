//! CLI definition and dispatch.

mod analyze;
mod render;
mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bunkai::config::{Config, LogFormat, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "bunkai", version, about = "Japanese sentence structure analysis")]
pub(crate) struct Cli {
    /// Config file (default: ~/.bunkai/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address override
        #[arg(long)]
        bind: Option<String>,
        /// Port override
        #[arg(long)]
        port: Option<u16>,
    },
    /// Analyze one sentence and print the result as JSON
    Analyze {
        sentence: String,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Render a sentence diagram as SVG
    Render {
        /// Sentence to analyze (needs an API key)
        #[arg(required_unless_present = "input", conflicts_with = "input")]
        sentence: Option<String>,
        /// Saved analysis JSON to render offline
        #[arg(long)]
        input: Option<PathBuf>,
        /// Write the SVG here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().with_context(|| "Failed to load configuration")?,
    };
    init_tracing(&config.logging, matches!(cli.command, Commands::Serve { .. }));

    match cli.command {
        Commands::Serve { bind, port } => serve::cmd_serve(config, bind, port).await,
        Commands::Analyze { sentence, pretty } => {
            analyze::cmd_analyze(config, &sentence, pretty).await
        }
        Commands::Render {
            sentence,
            input,
            output,
        } => render::cmd_render(config, sentence, input, output).await,
    }
}

/// Install the global subscriber. One-shot commands default to `warn` so
/// their stdout stays clean; `RUST_LOG` always wins.
fn init_tracing(logging: &LoggingConfig, serving: bool) {
    let default_level = if serving { logging.level.as_str() } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.with_target(false).init(),
    }
}
