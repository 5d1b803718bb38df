//! repo-explain CLI
//!
//! Main entry point for the repo-explain command-line tool.
//! Loads a git repository into an in-memory index and answers questions
//! about its code.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand};
use explain_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// repo-explain - ask questions about a git repository
#[derive(Parser, Debug)]
#[command(name = "repo-explain")]
#[command(about = "Answer questions about a git repository with retrieval-augmented generation", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "REPO_EXPLAIN_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "REPO_EXPLAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG is read as a fallback
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, mock)
    #[arg(short, long, global = true, env = "REPO_EXPLAIN_PROVIDER")]
    provider: Option<String>,

    /// Chat model identifier
    #[arg(short, long, global = true, env = "REPO_EXPLAIN_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a repository and answer one question
    Ask(AskCommand),

    /// Load a repository and answer questions read from stdin
    Chat(ChatCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Credentials may live in a .env file; it must be read before clap sees env
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to read .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    // Load configuration from the selected workspace, then apply CLI overrides
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("repo-explain starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    // A missing credential is fatal before any pipeline work starts
    config.validate()?;
    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
