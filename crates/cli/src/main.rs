//! Selah CLI, the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP gateway
//! - `chat`    Run one buffered chat turn from the terminal
//! - `config`  Print the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "selah",
    about = "Selah: scripture-grounded devotional chat",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message and print the reply
    Chat {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Conversation mode (auto, devotional, prayer, journal, ...)
        #[arg(long)]
        mode: Option<String>,

        /// Act as this signed-in user
        #[arg(long)]
        user: Option<String>,

        /// Print the full reply payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration (secrets removed)
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat {
            message,
            mode,
            user,
            json,
        } => commands::chat::run(message, mode, user, json).await?,
        Commands::Config { path } => commands::config_cmd::run(path)?,
    }

    Ok(())
}
