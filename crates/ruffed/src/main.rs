//! ruffed - interactive console for the certificate management API
//!
//! Main entry point for the ruffed CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, console, logout, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// ruffed - interactive console for the certificate management API
#[derive(Parser)]
#[command(name = "ruffed")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// API root URL (default: http://localhost:5000/api/v1)
    #[arg(long, global = true, env = "RUFFED_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open an interactive authenticated session
    Console(console::ConsoleArgs),

    /// Show the stored session and effective settings
    Status(status::StatusArgs),

    /// Clear locally stored session data
    Logout(logout::LogoutArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "ruffed=debug,ruffed_client=debug,ruffed_session=debug,ruffed_config=debug,warn"
    } else {
        "ruffed=info,ruffed_client=warn,ruffed_session=warn,warn"
    };

    let log_dir = ruffed_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ruffed.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "ruffed=trace,ruffed_client=debug,ruffed_session=debug,ruffed_config=debug,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        api_url: cli.api_url,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Console(args) => console::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Logout(args) => logout::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
