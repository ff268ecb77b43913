use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sami::cli::{self, ConfigCommands, MemoryCommands};

#[derive(Parser)]
#[command(name = "sami")]
#[command(about = "SAMi - Smart Artificial Mind Interface")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to the platform config dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the voice loop with the wake word
    Listen,
    /// Interactive text conversation
    Chat,
    /// Ask a single question
    Ask {
        /// Command or question text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Inspect or edit the persistent memory
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sami=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    match args.command {
        Commands::Listen => cli::handle_listen(args.data_dir).await,
        Commands::Chat => cli::handle_chat(args.data_dir).await,
        Commands::Ask { text } => cli::handle_ask(text.join(" "), args.data_dir).await,
        Commands::Memory { command } => cli::handle_memory(command, args.data_dir).await,
        Commands::Config { command } => cli::handle_config(command, args.data_dir).await,
    }
}
