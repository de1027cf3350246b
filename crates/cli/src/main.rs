//! MoMo CLI: the main entry point.
//!
//! Commands:
//! - (none): Interactive chat
//! - `chat`: Interactive chat, or one message with `--message`
//! - `memory`: List or clear long-term memory
//! - `config`: Show where settings live and what they are

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "momo",
    about = "MoMo: a cat-girl in your terminal who remembers you and runs commands for you",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with MoMo
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Inspect long-term memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Show the configuration file path and effective settings
    Config {
        /// Also check that the configured endpoint answers
        #[arg(long)]
        check: bool,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// List the highest-ranked memories
    List {
        /// How many to show
        #[arg(short, long, default_value_t = momo_memory::DEFAULT_TOP_K)]
        limit: usize,
    },

    /// Forget everything
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr and stay quiet unless asked, so they don't break up the chat.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        None => commands::chat::run(None).await?,
        Some(Commands::Chat { message }) => commands::chat::run(message).await?,
        Some(Commands::Memory { action }) => match action {
            MemoryAction::List { limit } => commands::memory::list(limit)?,
            MemoryAction::Clear => commands::memory::clear()?,
        },
        Some(Commands::Config { check }) => commands::config_cmd::show(check).await?,
    }

    Ok(())
}
